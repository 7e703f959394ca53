/// Name of the global the client runtime installs
pub const GLOBAL_NAME: &str = "$mod";

/// Client side module runtime, emitted at the top of every CommonJS bundle.
///
/// It keeps definitions, aliases and instantiated modules in one registry object and only
/// installs itself when no other loader owns the global, so several bundles can share a page.
/// `ModuleRegistry` implements the same lookup rules.
pub const LOADER: &str = r#"(function(root, key) {
  var previous = root[key];
  var modules = {};
  var defined = {};
  var aliases = {};

  function fail(message) {
    throw new Error(message);
  }

  function normalize(id, callerId) {
    if (id.indexOf('.') < 0) return id;
    var parts = id.split('/');
    var out = [];
    if ((parts[0] === '.' || parts[0] === '..') && callerId) {
      out = callerId.split('/');
      out.pop();
    }
    for (var i = 0; i < parts.length; i++) {
      var part = parts[i];
      if (part === '..') {
        if (!out.length || (out.length === 1 && out[0] === '')) fail('Invalid module id ' + id);
        out.pop();
      } else if (part !== '.' && (part !== '' || i === 0)) {
        out.push(part);
      }
    }
    return out.join('/');
  }

  function search(id) {
    if (modules[id] || defined[id]) return id;
    if (aliases[id]) return aliases[id];
    var index = id + '/index';
    return (modules[index] || defined[index]) ? index : id;
  }

  function makeRequire(callerId) {
    return function(id) {
      id = search(normalize(id, callerId));
      var caller = callerId && defined[callerId];
      if (caller && caller.aliases && caller.aliases[id]) id = caller.aliases[id];

      var mod = modules[id];
      if (!mod) {
        var definition = defined[id];
        if (!definition) fail('module not found ' + id);
        var factory = definition.body;
        if ('string' === typeof factory) factory = eval(factory);
        mod = modules[id] = {
          id: id,
          exports: {},
          require: makeRequire(id),
          loaded: false,
          parent: modules[callerId],
          children: []
        };
        factory(mod.require, mod.exports, mod);
        mod.loaded = true;
      }

      var parent = callerId && modules[callerId];
      if (parent && parent.children.indexOf(mod) < 0) parent.children.push(mod);
      return mod.exports;
    };
  }

  var api = {
    modules: modules,
    defined: defined,
    aliases: aliases,

    define: function(id, body, options) {
      var definition = options || {};
      definition.body = body;
      var ids = 'string' === typeof id ? [id] : id;
      defined[ids[0]] = definition;
      for (var i = 1; i < ids.length; i++) aliases[ids[i]] = ids[0];
    },

    normalize: normalize,

    noConflict: function() {
      root[key] = previous;
      return api;
    }
  };

  api.require = makeRequire();

  if (!previous || !previous.require || !previous.define) {
    root[key] = api;
    root.require = api.require;
  }
})(window, "$mod");
"#;
