use serde::Serialize;

use crate::token::Span;

/// The whole program: top-level calls in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Expression {
    VariableReference(VariableReference),
    LiteralNumber(LiteralNumber),
    Call(Call),
    Assignment(Assignment),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableReference {
    pub name: String,
}

/// Numeric literal text, forwarded to the output untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralNumber {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
    /// Diagnostics only; two calls with different spans still compare equal.
    pub span: Span,
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub lhs: VariableReference,
    pub rhs: Box<Expression>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Call {
            name: name.into(),
            args,
            span: Span::default(),
        }
    }
}

impl Expression {
    pub fn reference(name: impl Into<String>) -> Self {
        Expression::VariableReference(VariableReference { name: name.into() })
    }

    pub fn number(text: impl Into<String>) -> Self {
        Expression::LiteralNumber(LiteralNumber { text: text.into() })
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call(Call::new(name, args))
    }

    pub fn assign(name: impl Into<String>, rhs: Expression) -> Self {
        Expression::Assignment(Assignment {
            lhs: VariableReference { name: name.into() },
            rhs: Box::new(rhs),
        })
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Expression::VariableReference(reference) => Some(&reference.name),
            _ => None,
        }
    }

    /// The call node if this is a call named `name`.
    pub fn as_call_named(&self, name: &str) -> Option<&Call> {
        match self {
            Expression::Call(call) if call.name == name => Some(call),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_equality_ignores_spans() {
        let mut left = Call::new("F", vec![Expression::number("1")]);
        left.span = Span::new(0, 4);
        let right = Call::new("F", vec![Expression::number("1")]);
        assert_eq!(left, right);
        assert_ne!(left, Call::new("G", vec![Expression::number("1")]));
    }

    #[test]
    fn accessors() {
        let expr = Expression::call("Args", vec![Expression::reference("x")]);
        assert!(expr.as_call_named("Args").is_some());
        assert!(expr.as_call_named("HashMap").is_none());
        assert_eq!(Expression::reference("x").as_reference(), Some("x"));
        assert_eq!(Expression::number("3").as_reference(), None);
    }

    #[test]
    fn serializes_with_a_kind_tag() {
        let mut call = Call::new(
            "F",
            vec![
                Expression::reference("x"),
                Expression::assign("y", Expression::number("1")),
            ],
        );
        call.span = Span::new(0, 10);
        let json = serde_json::to_value(Block { calls: vec![call] }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "calls": [{
                    "name": "F",
                    "args": [
                        { "kind": "VariableReference", "name": "x" },
                        {
                            "kind": "Assignment",
                            "lhs": { "name": "y" },
                            "rhs": { "kind": "LiteralNumber", "text": "1" }
                        }
                    ],
                    "span": { "start": 0, "end": 10 }
                }]
            })
        );
    }
}
