use crate::chunk::Chunk;

use std::fmt;
use std::rc::Rc;

/// A compiled function body. Only the script-level function exists today;
/// calls, closures and classes are reserved.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: Option<String>,
    pub arity: u8,
    pub chunk: Chunk,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<script>"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Function(Rc<Function>),
}

impl Value {
    pub fn nil() -> Value {
        Value::Nil
    }

    pub fn boolean(b: bool) -> Value {
        Value::Bool(b)
    }

    pub fn number(n: f64) -> Value {
        Value::Number(n)
    }

    pub fn string<S>(s: S) -> Value
    where
        S: AsRef<str>,
    {
        Value::String(Rc::from(s.as_ref()))
    }

    /// `nil` and `false` are falsey, everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(fun) => write!(f, "{}", fun),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    #[test_case(Value::Nil, Value::Nil, true ; "nil equals nil")]
    #[test_case(Value::boolean(true), Value::boolean(true), true ; "same bools")]
    #[test_case(Value::boolean(true), Value::boolean(false), false ; "different bools")]
    #[test_case(Value::number(1.5), Value::number(1.5), true ; "same numbers")]
    #[test_case(Value::number(0.0), Value::number(-0.0), true ; "signed zeros")]
    #[test_case(Value::number(f64::NAN), Value::number(f64::NAN), false ; "nan")]
    #[test_case(Value::string("ab"), Value::string("ab"), true ; "same strings")]
    #[test_case(Value::string("ab"), Value::string("ba"), false ; "different strings")]
    #[test_case(Value::Nil, Value::boolean(false), false ; "nil is not false")]
    #[test_case(Value::number(0.0), Value::boolean(false), false ; "zero is not false")]
    #[test_case(Value::string("1"), Value::number(1.0), false ; "string is not number")]
    fn test_equality(left: Value, right: Value, expected: bool) {
        assert_eq!(left == right, expected)
    }

    #[test]
    fn functions_compare_by_identity() {
        let fun = Rc::new(Function::default());
        let same = Value::Function(Rc::clone(&fun));
        let other = Value::Function(Rc::new(Function::default()));

        assert_eq!(Value::Function(fun), same);
        assert_ne!(same, other)
    }

    #[test_case(Value::Nil, true ; "nil")]
    #[test_case(Value::boolean(false), true ; "false")]
    #[test_case(Value::boolean(true), false ; "true")]
    #[test_case(Value::number(0.0), false ; "zero")]
    #[test_case(Value::string(""), false ; "empty string")]
    fn test_falsey(value: Value, expected: bool) {
        assert_eq!(value.is_falsey(), expected)
    }

    #[test_case(Value::Nil, "nil" ; "nil")]
    #[test_case(Value::boolean(true), "true" ; "bool")]
    #[test_case(Value::number(3.0), "3" ; "whole number")]
    #[test_case(Value::number(2.5), "2.5" ; "fraction")]
    #[test_case(Value::string("hi there"), "hi there" ; "string")]
    #[test_case(Value::Function(Rc::new(Function::default())), "<script>" ; "script")]
    fn test_display(value: Value, expected: &str) {
        assert_eq!(value.to_string(), expected)
    }
}
