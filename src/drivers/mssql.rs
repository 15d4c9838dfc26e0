use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::{Client, ColumnData, Config, FromSql, QueryItem, Row, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::config::DeliveryMode;
use crate::error::{RdaoError, Result};
use crate::traits::{DatabaseDriver, RowSink};
use crate::types::{RawQueryResult, SqlValue};

/// SQL Server driver implementation using tiberius.
pub struct MssqlDriver {
    client: Option<Client<Compat<TcpStream>>>,
    delivery: DeliveryMode,
}

impl MssqlDriver {
    /// Connect to SQL Server using an ADO.NET-style connection string, e.g.
    /// `server=tcp:localhost,1433;user=sa;password=...;database=shop;TrustServerCertificate=true`.
    pub async fn connect(connection_string: &str, delivery: DeliveryMode) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)
            .map_err(|e| RdaoError::ConnectionFailed(e.to_string()))?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| RdaoError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true)
            .map_err(|e| RdaoError::ConnectionFailed(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| RdaoError::ConnectionFailed(e.to_string()))?;
        debug!(?delivery, "SQL Server session established");

        Ok(Self {
            client: Some(client),
            delivery,
        })
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let client = self.client.as_mut().ok_or(RdaoError::NotConnected)?;

        // Convert SqlValue params to tiberius compatible types
        let converted_params: Vec<Box<dyn ToSql>> =
            params.iter().map(sql_value_to_tosql).collect();
        let param_refs: Vec<&dyn ToSql> = converted_params.iter().map(|b| b.as_ref()).collect();

        let mut stream = client
            .query(sql, &param_refs)
            .await
            .map_err(|e| RdaoError::QueryFailed(e.to_string()))?;

        match self.delivery {
            DeliveryMode::Streamed => {
                while let Some(item) = stream
                    .try_next()
                    .await
                    .map_err(|e| RdaoError::QueryFailed(e.to_string()))?
                {
                    match item {
                        QueryItem::Metadata(meta) => {
                            let names: Vec<String> =
                                meta.columns().iter().map(|c| c.name().to_string()).collect();
                            sink.columns(&names);
                        }
                        QueryItem::Row(row) => sink.row(row_values(row)),
                    }
                }
            }
            DeliveryMode::Bulk => {
                let result_sets = stream
                    .into_results()
                    .await
                    .map_err(|e| RdaoError::QueryFailed(e.to_string()))?;
                for rows in result_sets {
                    // Column names come from the first row, as with any bulk batch
                    let columns = rows
                        .first()
                        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                        .unwrap_or_default();
                    let rows = rows.into_iter().map(row_values).collect();
                    sink.batch(RawQueryResult::new(columns, rows));
                }
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let client = self.client.take().ok_or(RdaoError::NotConnected)?;
        client
            .close()
            .await
            .map_err(|e| RdaoError::DisconnectFailed(e.to_string()))
    }
}

/// Convert a SqlValue to a boxed ToSql trait object.
fn sql_value_to_tosql(value: &SqlValue) -> Box<dyn ToSql> {
    match value {
        SqlValue::Null => Box::new(None::<String>),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Int32(i) => Box::new(*i),
        SqlValue::Int64(i) => Box::new(*i),
        SqlValue::Float64(f) => Box::new(*f),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Bytes(b) => Box::new(b.clone()),
        SqlValue::Date(d) => Box::new(*d),
        SqlValue::Time(t) => Box::new(*t),
        SqlValue::Timestamp(ts) => Box::new(*ts),
        SqlValue::TimestampTz(ts) => Box::new(*ts),
    }
}

fn row_values(row: Row) -> Vec<SqlValue> {
    row.into_iter().map(column_value).collect()
}

/// Convert a driver cell into a SqlValue without changing its meaning.
fn column_value(data: ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v.map(i32::from).into(),
        ColumnData::I16(v) => v.map(i32::from).into(),
        ColumnData::I32(v) => v.into(),
        ColumnData::I64(v) => v.into(),
        ColumnData::F32(v) => v.map(f64::from).into(),
        ColumnData::F64(v) => v.into(),
        ColumnData::Bit(v) => v.into(),
        ColumnData::String(v) => v.map(|s| s.into_owned()).into(),
        ColumnData::Guid(v) => v.map(|g| g.to_string()).into(),
        ColumnData::Binary(v) => v.map(|b| b.into_owned()).into(),
        ColumnData::Numeric(v) => v.map_or(SqlValue::Null, numeric_value),
        ColumnData::Xml(v) => v.map(|x| x.into_owned().into_string()).into(),
        temporal => temporal_value(&temporal),
    }
}

/// `decimal(p, 0)` (this is what `@@IDENTITY` reports) becomes an integer.
fn numeric_value(n: Numeric) -> SqlValue {
    if n.scale() == 0 {
        if let Ok(i) = i64::try_from(n.value()) {
            return SqlValue::Int64(i);
        }
    }
    SqlValue::Float64(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
}

fn temporal_value(data: &ColumnData<'static>) -> SqlValue {
    let value = match data {
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data).map(SqlValue::from)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data).map(SqlValue::from),
        ColumnData::Time(_) => NaiveTime::from_sql(data).map(SqlValue::from),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(data).map(SqlValue::from)
        }
        _ => Ok(SqlValue::Null),
    };
    value.unwrap_or(SqlValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_integer_cells_widen() {
        assert_eq!(column_value(ColumnData::U8(Some(7))), SqlValue::Int32(7));
        assert_eq!(column_value(ColumnData::I16(Some(-3))), SqlValue::Int32(-3));
        assert_eq!(column_value(ColumnData::I64(Some(1 << 40))), SqlValue::Int64(1 << 40));
    }

    #[test]
    fn test_null_cells() {
        assert_eq!(column_value(ColumnData::I32(None)), SqlValue::Null);
        assert_eq!(column_value(ColumnData::String(None)), SqlValue::Null);
        assert_eq!(column_value(ColumnData::Numeric(None)), SqlValue::Null);
    }

    #[test]
    fn test_text_cell() {
        let cell = ColumnData::String(Some(Cow::Owned("Alice".to_string())));
        assert_eq!(column_value(cell), SqlValue::from("Alice"));
    }

    #[test]
    fn test_identity_numeric_is_integer() {
        assert_eq!(numeric_value(Numeric::new_with_scale(42, 0)), SqlValue::Int64(42));
        assert_eq!(
            numeric_value(Numeric::new_with_scale(12345, 2)),
            SqlValue::Float64(123.45)
        );
    }
}
