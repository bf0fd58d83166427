use crate::codec::Context;
use crate::converter::Converter;
use crate::error::CodecError;
use crate::json::JsonValue;
use crate::types::Ty;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};

/// `datetime` as text and `duration` as integer milliseconds.
pub struct DateTimeConverter;

fn parse_datetime(text: &str, format: Option<&str>) -> Option<DateTime<FixedOffset>> {
    if let Some(format) = format {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt);
        }
        // Formats without an offset are read as UTC.
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().fixed_offset());
        }
        if let Some(naive) = NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    DateTime::parse_from_rfc3339(text).ok()
}

impl Converter for DateTimeConverter {
    fn name(&self) -> &str {
        "datetime"
    }

    fn can_process(&self, ty: &Ty) -> bool {
        matches!(ty, Ty::DateTime | Ty::Duration)
    }

    fn try_serialize(
        &self,
        cx: &mut Context<'_>,
        value: &Value,
        ty: &Ty,
    ) -> Result<JsonValue, CodecError> {
        match (ty, value) {
            (Ty::DateTime, Value::DateTime(dt)) => Ok(JsonValue::String(
                match cx.config().date_time_format.as_deref() {
                    Some(format) => dt.format(format).to_string(),
                    None => dt.to_rfc3339(),
                },
            )),
            (Ty::Duration, Value::Duration(d)) => Ok(JsonValue::Int64(d.num_milliseconds())),
            (_, other) => Err(CodecError::mismatch(ty, other.kind_name())),
        }
    }

    fn try_deserialize(
        &self,
        cx: &mut Context<'_>,
        json: &JsonValue,
        ty: &Ty,
        instance: &mut Value,
    ) -> Result<(), CodecError> {
        *instance = match ty {
            Ty::DateTime => {
                let text = json.as_str()?;
                let format = cx.config().date_time_format.as_deref();
                Value::DateTime(
                    parse_datetime(text, format)
                        .ok_or_else(|| CodecError::mismatch(ty, format!("string {text:?}")))?,
                )
            }
            Ty::Duration => {
                let millis = json.as_i64()?;
                Value::Duration(
                    TimeDelta::try_milliseconds(millis)
                        .ok_or_else(|| CodecError::mismatch(ty, format!("{millis} ms")))?,
                )
            }
            other => return Err(CodecError::mismatch("datetime or duration", other)),
        };
        Ok(())
    }
}
