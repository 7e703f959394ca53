use swc_core::common::input::StringInput;
use swc_core::common::sync::Lrc;
use swc_core::common::FileName;
use swc_core::common::SourceMap;
use swc_core::ecma::ast::CallExpr;
use swc_core::ecma::ast::Callee;
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::ast::Expr;
use swc_core::ecma::ast::Lit;
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::Parser;
use swc_core::ecma::parser::Syntax;
use swc_core::ecma::visit::Visit;
use swc_core::ecma::visit::VisitWith;

/// Collects the ids of `require("...")` calls with a single string literal argument.
///
/// Ids are kept in source order without duplicates. Method calls such as `obj.require("x")`
/// and requires with computed ids are skipped.
#[derive(Default)]
pub struct RequireCollector {
  pub ids: Vec<String>,
}

impl RequireCollector {
  pub fn collect(code: &str) -> anyhow::Result<Vec<String>> {
    let source_map = Lrc::new(SourceMap::default());
    let source_file = source_map.new_source_file(Lrc::new(FileName::Anon), code.into());

    let lexer = Lexer::new(
      Syntax::Es(Default::default()),
      EsVersion::latest(),
      StringInput::from(&*source_file),
      None,
    );

    let mut parser = Parser::new_from(lexer);
    let program = match parser.parse_program() {
      Err(err) => anyhow::bail!("{:?}", err.kind()),
      Ok(program) => program,
    };

    let mut collector = RequireCollector::default();
    program.visit_with(&mut collector);

    Ok(collector.ids)
  }

  fn required_id(call: &CallExpr) -> Option<String> {
    let Callee::Expr(callee) = &call.callee else {
      return None;
    };
    let Expr::Ident(ident) = &**callee else {
      return None;
    };
    if &*ident.sym != "require" || call.args.len() != 1 {
      return None;
    }

    let argument = &call.args[0];
    if argument.spread.is_some() {
      return None;
    }

    match &*argument.expr {
      Expr::Lit(Lit::Str(id)) => Some(id.value.to_string()),
      _ => None,
    }
  }
}

impl Visit for RequireCollector {
  fn visit_call_expr(&mut self, call: &CallExpr) {
    if let Some(id) = Self::required_id(call) {
      if !self.ids.contains(&id) {
        self.ids.push(id);
      }
    }

    call.visit_children_with(self);
  }
}
