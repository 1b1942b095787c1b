use std::collections::BTreeMap;
use std::fmt;

/// A value bound to a name in the session environment.
///
/// Most kinds survive a snapshot. `Builtin` is a handle into the running
/// process and never does; non-finite floats are likewise rejected at
/// persist time.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Builtin(_) => "builtin",
        }
    }
}

impl fmt::Display for Value {
    /// Top-level strings print bare; everything else prints in literal form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            other => fmt_literal(other, f),
        }
    }
}

fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Unit => write!(f, "nil"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => {
            if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                write!(f, "{:.1}", x)
            } else {
                write!(f, "{}", x)
            }
        }
        Value::Str(s) => write!(f, "{:?}", s),
        Value::List(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_literal(item, f)?;
            }
            write!(f, "]")
        }
        Value::Map(entries) => {
            write!(f, "{{")?;
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}: ", key)?;
                fmt_literal(val, f)?;
            }
            write!(f, "}}")
        }
        Value::Builtin(b) => write!(f, "<native {}>", b.name()),
    }
}

/// A native routine exposed to executed code as a callable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Str,
    Int,
    Float,
    Keys,
    Push,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Print,
        Builtin::Len,
        Builtin::Str,
        Builtin::Int,
        Builtin::Float,
        Builtin::Keys,
        Builtin::Push,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Keys => "keys",
            Builtin::Push => "push",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        Builtin::ALL.iter().copied().find(|b| b.name() == name)
    }
}
