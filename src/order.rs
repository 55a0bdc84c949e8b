use smol_str::SmolStr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: SmolStr,
    pub direction: Order,
}

impl OrderBy {
    pub fn new<T: Into<SmolStr>>(column: T, direction: Order) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}
