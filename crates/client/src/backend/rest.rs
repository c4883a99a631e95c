//! Table access over `/rest/v1/<table>`.
//!
//! [`Query`] is a pure description of a filtered table request; turning it
//! into query-string pairs does no I/O, so the filter syntax is unit-tested
//! without a server. Writes always ask for `return=representation`, which is
//! what makes conditional updates observable: a `PATCH` whose filters match
//! nothing returns an empty array.

use std::fmt;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Backend, BackendError, read_json};

const PREFER_REPRESENTATION: &str = "return=representation";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Sort direction for `order=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `col=eq.value`
    Eq(String),
    /// `col=neq.value`
    Neq(String),
    /// `col=is.null`
    IsNull,
    /// `col=in.(a,b)`
    In(Vec<String>),
}

impl Filter {
    fn to_param(&self) -> String {
        match self {
            Self::Eq(v) => format!("eq.{v}"),
            Self::Neq(v) => format!("neq.{v}"),
            Self::IsNull => "is.null".to_string(),
            Self::In(values) => {
                let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
                format!("in.({})", list.join(","))
            }
        }
    }
}

/// Values inside `in.(...)` must be double-quoted when they contain
/// reserved characters.
fn quote_list_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', '\\', ' ']) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// A filtered request against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: Option<String>,
    filters: Vec<(String, Filter)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query on `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Restrict the returned columns (defaults to `*`).
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters
            .push((column.into(), Filter::Eq(value.to_string())));
        self
    }

    #[must_use]
    pub fn neq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters
            .push((column.into(), Filter::Neq(value.to_string())));
        self
    }

    #[must_use]
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push((column.into(), Filter::IsNull));
        self
    }

    #[must_use]
    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filters.push((column.into(), Filter::In(values)));
        self
    }

    #[must_use]
    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The table this query targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The filters applied, in insertion order.
    #[must_use]
    pub fn filters(&self) -> &[(String, Filter)] {
        &self.filters
    }

    /// Query-string pairs for this request.
    ///
    /// `include_select` is false for writes without a returned projection.
    #[must_use]
    pub fn to_params(&self, include_select: bool) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);

        if include_select {
            params.push((
                "select".to_string(),
                self.select.clone().unwrap_or_else(|| "*".to_string()),
            ));
        }

        for (column, filter) in &self.filters {
            params.push((column.clone(), filter.to_param()));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, direction)| format!("{column}.{}", direction.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    fn path(&self) -> String {
        format!("rest/v1/{}", self.table)
    }
}

impl Backend {
    /// Read all rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows do not decode into `T`.
    #[instrument(skip(self, query), fields(table = %query.table))]
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, BackendError> {
        let url = self.endpoint(&query.path())?;
        let response = self
            .request(Method::GET, url)
            .await
            .query(&query.to_params(true))
            .send()
            .await?;
        read_json(response).await
    }

    /// Read exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` when no row (or more than one) matches.
    #[instrument(skip(self, query), fields(table = %query.table))]
    pub async fn select_single<T: DeserializeOwned>(&self, query: &Query) -> Result<T, BackendError> {
        let url = self.endpoint(&query.path())?;
        let response = self
            .request(Method::GET, url)
            .await
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .query(&query.to_params(true))
            .send()
            .await?;
        read_json(response).await
    }

    /// Read the first matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn select_first<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, BackendError> {
        let rows = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` on a unique violation.
    #[instrument(skip(self, row))]
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", PREFER_REPRESENTATION)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        read_json(response).await
    }

    /// Apply `patch` to every row matching `query`, returning the updated rows.
    ///
    /// An empty result means the filters matched nothing, which is how a
    /// conditional update reports that its precondition no longer holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, query, patch), fields(table = %query.table))]
    pub async fn update<B, T>(&self, query: &Query, patch: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&query.path())?;
        let response = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", PREFER_REPRESENTATION)
            .query(&query.to_params(true))
            .json(patch)
            .send()
            .await?;
        read_json(response).await
    }

    /// Delete every row matching `query`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, query), fields(table = %query.table))]
    pub async fn delete(&self, query: &Query) -> Result<usize, BackendError> {
        let url = self.endpoint(&query.path())?;
        let response = self
            .request(Method::DELETE, url)
            .await
            .header("Prefer", PREFER_REPRESENTATION)
            .query(&query.to_params(true))
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = read_json(response).await?;
        Ok(rows.len())
    }
}
