//! Python code generation.
//!
//! Special forms are desugared into Python expressions. Some of them lean on
//! small helper functions; which ones were needed is collected in a
//! [`Builtins`] value that travels alongside the rendered text, and each
//! helper is emitted once, ahead of the program.

use std::fmt;

use itertools::Itertools;
use tracing::debug;

use crate::ast::{Block, Call, Expression};
use crate::error::{CompileError, CompileResult};

pub const PRINT_BUILTIN: &str =
    "def builtin__print(*args, **kwargs):\n  print(*args, **kwargs)\n  return args[0]\n";

pub const ASSOC_BUILTIN: &str = "def builtin__assoc(k, v, obj):\n  obj[k] = v\n  return obj\n";

/// The parameter list inside `Def`.
pub const PARAMS_FORM: &str = "Args";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Print,
    Let,
    HashMap,
    Map,
    List,
    Call,
    Assoc,
    Has,
    Get,
    Cond,
    Def,
    Inc,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 12] = [
        SpecialForm::Print,
        SpecialForm::Let,
        SpecialForm::HashMap,
        SpecialForm::Map,
        SpecialForm::List,
        SpecialForm::Call,
        SpecialForm::Assoc,
        SpecialForm::Has,
        SpecialForm::Get,
        SpecialForm::Cond,
        SpecialForm::Def,
        SpecialForm::Inc,
    ];

    pub fn from_name(name: &str) -> Option<SpecialForm> {
        SpecialForm::ALL.into_iter().find(|form| form.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Print => "Print",
            SpecialForm::Let => "Let",
            SpecialForm::HashMap => "HashMap",
            SpecialForm::Map => "Map",
            SpecialForm::List => "List",
            SpecialForm::Call => "Call",
            SpecialForm::Assoc => "Assoc",
            SpecialForm::Has => "Has",
            SpecialForm::Get => "Get",
            SpecialForm::Cond => "Cond",
            SpecialForm::Def => "Def",
            SpecialForm::Inc => "Inc",
        }
    }

    /// How the form is meant to be called, for editor hints.
    pub fn shape(self) -> &'static str {
        match self {
            SpecialForm::Print => "Print[x...]",
            SpecialForm::Let => "Let[binding..., body]",
            SpecialForm::HashMap => "HashMap[]",
            SpecialForm::Map => "Map[fn, coll...]",
            SpecialForm::List => "List[x...]",
            SpecialForm::Call => "Call[fn, x...]",
            SpecialForm::Assoc => "Assoc[key, value, map]",
            SpecialForm::Has => "Has[key, map]",
            SpecialForm::Get => "Get[key, map]",
            SpecialForm::Cond => "Cond[test, then, else]",
            SpecialForm::Def => "Def[name, Args[param...], body] | Def[name = value]",
            SpecialForm::Inc => "Inc[x...]",
        }
    }
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Helpers the rendered program depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Builtins {
    /// `builtin__assoc`, shared by `Assoc`, `Has` and `Get`.
    pub assoc: bool,
    /// `builtin__print`, used by `Print`.
    pub print: bool,
}

impl Builtins {
    pub fn prelude(self) -> String {
        let mut prelude = String::new();
        if self.print {
            prelude.push_str(PRINT_BUILTIN);
            prelude.push('\n');
        }
        if self.assoc {
            prelude.push_str(ASSOC_BUILTIN);
            prelude.push('\n');
        }
        prelude
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    pub builtins: Builtins,
}

impl Rendered {
    /// Helpers first, then the program.
    pub fn into_source(self) -> String {
        let mut source = self.builtins.prelude();
        source.push_str(&self.body);
        source
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.builtins.prelude(), self.body)
    }
}

pub fn render(block: &Block) -> CompileResult<Rendered> {
    let mut builtins = Builtins::default();
    let statements = block
        .calls
        .iter()
        .map(|call| render_call(call, &mut builtins))
        .collect::<CompileResult<Vec<_>>>()?;

    debug!(
        statements = statements.len(),
        assoc = builtins.assoc,
        print = builtins.print,
        "rendered program"
    );
    Ok(Rendered {
        body: statements.join("\n"),
        builtins,
    })
}

fn render_expression(expr: &Expression, builtins: &mut Builtins) -> CompileResult<String> {
    match expr {
        Expression::VariableReference(reference) => Ok(reference.name.clone()),
        Expression::LiteralNumber(number) => Ok(number.text.clone()),
        Expression::Call(call) => render_call(call, builtins),
        Expression::Assignment(assignment) => Ok(format!(
            "{} = {}",
            assignment.lhs.name,
            render_expression(&assignment.rhs, builtins)?
        )),
    }
}

fn render_all(args: &[Expression], builtins: &mut Builtins) -> CompileResult<Vec<String>> {
    args.iter()
        .map(|arg| render_expression(arg, builtins))
        .collect()
}

fn render_call(call: &Call, builtins: &mut Builtins) -> CompileResult<String> {
    let Some(form) = SpecialForm::from_name(&call.name) else {
        let args = render_all(&call.args, builtins)?;
        return Ok(format!("{}({})", call.name, args.iter().join(",")));
    };

    match form {
        SpecialForm::Print => {
            builtins.print = true;
            let args = render_all(&call.args, builtins)?;
            Ok(format!("builtin__print({})", args.iter().join(",")))
        }
        SpecialForm::Let => {
            let Some((body, bindings)) = call.args.split_last() else {
                return Err(arity(form, call, "at least 1"));
            };
            let params = bindings
                .iter()
                .map(|binding| match binding {
                    Expression::VariableReference(reference) => Ok(reference.name.clone()),
                    Expression::Assignment(_) => render_expression(binding, builtins),
                    _ => Err(CompileError::malformed(
                        form.name(),
                        "bindings must be names or assignments",
                        call.span,
                    )),
                })
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(format!(
                "lambda {}: {}",
                params.iter().join(", "),
                render_expression(body, builtins)?
            ))
        }
        SpecialForm::HashMap => {
            if call.args.len() > 1 {
                return Err(arity(form, call, "at most 1"));
            }
            Ok("dict()".to_string())
        }
        SpecialForm::Map => {
            if call.args.len() < 2 {
                return Err(arity(form, call, "at least 2"));
            }
            let args = render_all(&call.args, builtins)?;
            Ok(format!("map({}, {})", args[0], args[1..].iter().join(", ")))
        }
        SpecialForm::List => {
            let args = render_all(&call.args, builtins)?;
            Ok(format!("[{}]", args.iter().join(", ")))
        }
        SpecialForm::Call => {
            if call.args.is_empty() {
                return Err(arity(form, call, "at least 1"));
            }
            let args = render_all(&call.args, builtins)?;
            Ok(format!("(({})({}))", args[0], args[1..].iter().join(",")))
        }
        SpecialForm::Assoc => {
            let [key, value, map] = exactly::<3>(form, call)?;
            builtins.assoc = true;
            Ok(format!(
                "builtin__assoc({}, {}, {})",
                render_expression(key, builtins)?,
                render_expression(value, builtins)?,
                render_expression(map, builtins)?
            ))
        }
        SpecialForm::Has => {
            let [key, map] = exactly::<2>(form, call)?;
            builtins.assoc = true;
            let key = render_expression(key, builtins)?;
            let map = render_expression(map, builtins)?;
            Ok(format!("({map}.get({key}, None) != None)"))
        }
        SpecialForm::Get => {
            let [key, map] = exactly::<2>(form, call)?;
            builtins.assoc = true;
            let key = render_expression(key, builtins)?;
            let map = render_expression(map, builtins)?;
            Ok(format!("({map}.get({key}))"))
        }
        SpecialForm::Cond => {
            let [test, then, otherwise] = exactly::<3>(form, call)?;
            let test = render_expression(test, builtins)?;
            let then = render_expression(then, builtins)?;
            let otherwise = render_expression(otherwise, builtins)?;
            Ok(format!("{then} if {test} else {otherwise}"))
        }
        SpecialForm::Def => render_def(call, builtins),
        SpecialForm::Inc => {
            let args = render_all(&call.args, builtins)?;
            Ok(args.iter().map(|arg| format!("{arg}+1")).join(","))
        }
    }
}

fn render_def(call: &Call, builtins: &mut Builtins) -> CompileResult<String> {
    match call.args.as_slice() {
        [Expression::VariableReference(name), params, body] => {
            let Some(params) = params.as_call_named(PARAMS_FORM) else {
                return Err(CompileError::malformed(
                    "Def",
                    "the second argument must be `Args[...]`",
                    call.span,
                ));
            };
            let mut rendered = Vec::new();
            render_params(params, builtins, &mut rendered)?;
            Ok(format!(
                "{} = lambda {}: {}",
                name.name,
                rendered.iter().join(", "),
                render_expression(body, builtins)?
            ))
        }
        [Expression::Assignment(assignment)] => Ok(format!(
            "{} = {}",
            assignment.lhs.name,
            render_expression(&assignment.rhs, builtins)?
        )),
        _ => Err(CompileError::malformed(
            "Def",
            "expected `Def[name, Args[...], body]` or `Def[name = value]`",
            call.span,
        )),
    }
}

/// Flattens an `Args[...]` list, nested lists included, into Python parameters.
fn render_params(
    params: &Call,
    builtins: &mut Builtins,
    out: &mut Vec<String>,
) -> CompileResult<()> {
    for param in &params.args {
        match param {
            Expression::VariableReference(reference) => out.push(reference.name.clone()),
            Expression::Assignment(_) => out.push(render_expression(param, builtins)?),
            Expression::Call(nested) if nested.name == PARAMS_FORM => {
                render_params(nested, builtins, out)?;
            }
            Expression::Call(map) if map.name == SpecialForm::HashMap.name() => {
                match map.args.as_slice() {
                    [Expression::VariableReference(name)] => {
                        out.push(format!("{} = dict()", name.name));
                    }
                    _ => {
                        return Err(CompileError::malformed(
                            "HashMap",
                            "a `HashMap` parameter takes exactly one name",
                            map.span,
                        ));
                    }
                }
            }
            _ => {
                return Err(CompileError::malformed(
                    "Def",
                    "parameters must be names, assignments, `Args[...]` or `HashMap[name]`",
                    params.span,
                ));
            }
        }
    }
    Ok(())
}

fn exactly<const N: usize>(form: SpecialForm, call: &Call) -> CompileResult<&[Expression; N]> {
    call.args
        .as_slice()
        .try_into()
        .map_err(|_| arity(form, call, &N.to_string()))
}

fn arity(form: SpecialForm, call: &Call, expected: &str) -> CompileError {
    CompileError::malformed(
        form.name(),
        format!(
            "expected {expected} argument(s), got {}",
            call.args.len()
        ),
        call.span,
    )
}
