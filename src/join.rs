use smol_str::SmolStr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// A join against another table. The ON condition is written verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: SmolStr,
    pub condition: SmolStr,
}

impl Join {
    pub fn new<T, C>(kind: JoinKind, table: T, condition: C) -> Self
    where
        T: Into<SmolStr>,
        C: Into<SmolStr>,
    {
        Self {
            kind,
            table: table.into(),
            condition: condition.into(),
        }
    }
}

pub type Joins = Vec<Join>;
