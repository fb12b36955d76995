use chrono::NaiveDate;
use sqlx::{
    MySql,
    mysql::MySqlArguments,
    query::{QueryAs, QueryScalar},
};

pub mod attendance;
pub mod justification;
pub mod leave_request;
pub mod worker;

// Helper enum for typed SQLx binding
pub(crate) enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
}

/// Dynamic `WHERE` clause plus its bind values, in order.
pub(crate) struct Filter<'a> {
    pub sql: String,
    pub args: Vec<FilterValue<'a>>,
}

impl<'a> Filter<'a> {
    pub fn new() -> Self {
        Self {
            sql: String::from(" WHERE 1=1"),
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, clause: &str, value: FilterValue<'a>) {
        self.sql.push_str(" AND ");
        self.sql.push_str(clause);
        self.args.push(value);
    }

    /// Inclusive `[from, to]` range on a date column.
    pub fn date_range(&mut self, column: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if let Some(from) = from {
            self.push(&format!("{column} >= ?"), FilterValue::Date(from));
        }
        if let Some(to) = to {
            self.push(&format!("{column} <= ?"), FilterValue::Date(to));
        }
    }

    pub fn bind_scalar<'q, O>(
        &'q self,
        mut q: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg {
                FilterValue::U64(v) => q.bind(*v),
                FilterValue::Str(s) => q.bind(*s),
                FilterValue::Date(d) => q.bind(*d),
            };
        }
        q
    }

    pub fn bind_rows<'q, O>(
        &'q self,
        mut q: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for arg in &self.args {
            q = match arg {
                FilterValue::U64(v) => q.bind(*v),
                FilterValue::Str(s) => q.bind(*s),
                FilterValue::Date(d) => q.bind(*d),
            };
        }
        q
    }
}

/// 1-based page with the size capped at 100.
pub(crate) struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl Pagination {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        let per_page = per_page.unwrap_or(10).clamp(1, 100);
        let page = page.unwrap_or(1).max(1);
        Self {
            page,
            per_page,
            offset: (page - 1).saturating_mul(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        let p = Pagination::new(None, None);
        assert_eq!((p.page, p.per_page, p.offset), (1, 10, 0));

        let p = Pagination::new(Some(3), Some(500));
        assert_eq!((p.page, p.per_page, p.offset), (3, 100, 200));

        let p = Pagination::new(Some(0), Some(0));
        assert_eq!((p.page, p.per_page), (1, 1));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = Pagination::new(Some(u64::MAX), Some(10));
        assert_eq!(p.page, u64::MAX);
        assert_eq!(p.offset, u64::MAX);
        assert_eq!(u32::try_from(p.page).unwrap_or(u32::MAX), u32::MAX);
    }

    #[test]
    fn filter_builds_clauses_in_order() {
        let mut filter = Filter::new();
        filter.push("worker_id = ?", FilterValue::U64(4));
        filter.date_range("date", NaiveDate::from_ymd_opt(2026, 3, 1), None);

        assert_eq!(filter.sql, " WHERE 1=1 AND worker_id = ? AND date >= ?");
        assert_eq!(filter.args.len(), 2);
    }
}
