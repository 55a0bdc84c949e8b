use smol_str::SmolStr;

use crate::{
    condition::{Conditions, Conjunction, WhereClause},
    ident::{Ident, IntoIdents},
    join::{Join, JoinKind, Joins},
    order::{Order, OrderBy},
    paginate::Paginator,
    value::IntoOperand,
};

/// A reusable set of SELECT clauses, applied to queries with [`crate::Query::apply`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fragment {
    pub(crate) wheres: Conditions,
    pub(crate) joins: Joins,
    pub(crate) orders: Vec<OrderBy>,
    pub(crate) columns: Vec<Ident>,
    pub(crate) groups: Vec<Ident>,
    pub(crate) having: Conditions,
    pub(crate) distinct: bool,
    pub(crate) paginator: Paginator,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.wheres
            .push(WhereClause::new(Conjunction::And, column, operator, value));
        self
    }

    pub fn or_where<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.wheres
            .push(WhereClause::new(Conjunction::Or, column, operator, value));
        self
    }

    pub fn join<T, C>(&mut self, table: T, condition: C) -> &mut Self
    where
        T: Into<SmolStr>,
        C: Into<SmolStr>,
    {
        self.joins.push(Join::new(JoinKind::Inner, table, condition));
        self
    }

    pub fn left_join<T, C>(&mut self, table: T, condition: C) -> &mut Self
    where
        T: Into<SmolStr>,
        C: Into<SmolStr>,
    {
        self.joins.push(Join::new(JoinKind::Left, table, condition));
        self
    }

    pub fn order_by<T: Into<SmolStr>>(&mut self, column: T, order: Order) -> &mut Self {
        self.orders.push(OrderBy::new(column, order));
        self
    }

    pub fn select<T: IntoIdents>(&mut self, columns: T) -> &mut Self {
        self.columns.extend(columns.into_idents());
        self
    }

    pub fn group_by<T: IntoIdents>(&mut self, columns: T) -> &mut Self {
        self.groups.extend(columns.into_idents());
        self
    }

    pub fn having<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.having
            .push(WhereClause::new(Conjunction::And, column, operator, value));
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.paginator.limit(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.paginator.offset(offset);
        self
    }

    /// Appends every list of `other`. Limit and offset are only taken when unset here.
    pub(crate) fn merge(&mut self, other: &Fragment) {
        self.wheres.extend(&other.wheres);
        self.joins.extend(other.joins.iter().cloned());
        self.orders.extend(other.orders.iter().cloned());
        self.columns.extend(other.columns.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
        self.having.extend(&other.having);
        self.distinct |= other.distinct;
        self.paginator.fill(&other.paginator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut active = Fragment::new();
        active
            .where_("active", "=", true)
            .order_by("created_at", Order::Desc)
            .limit(10)
            .distinct();

        let mut base = Fragment::new();
        base.where_("tenant_id", "=", 7).limit(50).offset(5);
        base.merge(&active);

        assert_eq!(2, base.wheres.len());
        assert_eq!(1, base.orders.len());
        assert!(base.distinct);
        assert_eq!(Some(50), base.paginator.maybe_limit);
        assert_eq!(Some(5), base.paginator.maybe_offset);
    }
}
