use crate::llm::types::ToolDef;
use crate::tools::Tool;
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::{Value, json};

pub fn tool_def() -> ToolDef {
    ToolDef::function(
        "current_time",
        "Returns the current date and time in RFC 3339 format. Pass a timezone of UTC (default) or a fixed offset such as +09:00 or -0530.",
        json!({
            "type": "object",
            "properties": {
                "timezone": {"type": "string", "description": "UTC or an offset like +09:00"}
            }
        }),
    )
}

/// Parses `UTC`, `Z`, `+HH:MM`, `-HHMM` or `+HH`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let tz = raw.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }
    let (sign, rest) = match tz.as_bytes()[0] {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => bail!("unsupported timezone '{raw}': use UTC or an offset like +09:00"),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) || !matches!(digits.len(), 2 | 4) {
        bail!("malformed offset '{raw}'");
    }
    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = if digits.len() == 4 { digits[2..].parse()? } else { 0 };
    if hours > 23 || minutes > 59 {
        bail!("offset out of range '{raw}'");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset out of range '{raw}'"))
}

pub fn format_time(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct CurrentTime;

#[async_trait::async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn tool_def(&self) -> ToolDef {
        tool_def()
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let tz = args.get("timezone").and_then(|v| v.as_str()).unwrap_or("UTC");
        let offset = parse_offset(tz)?;
        Ok(Value::String(format_time(Utc::now(), offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_supported_offsets() {
        assert_eq!(parse_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("+09:00").unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(
            parse_offset("-0530").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_offset("+02").unwrap().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn rejects_named_zones_and_garbage() {
        assert!(parse_offset("Asia/Tokyo").is_err());
        assert!(parse_offset("+9").is_err());
        assert!(parse_offset("+25:00").is_err());
        assert!(parse_offset("+ab:cd").is_err());
    }

    #[test]
    fn formats_with_offset() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_time(now, parse_offset("UTC").unwrap()), "2024-01-02T03:04:05Z");
        assert_eq!(
            format_time(now, parse_offset("+09:00").unwrap()),
            "2024-01-02T12:04:05+09:00"
        );
    }

    #[tokio::test]
    async fn tool_defaults_to_utc() {
        let out = CurrentTime.call(&json!({})).await.unwrap();
        assert!(out.as_str().unwrap().ends_with('Z'));
    }
}
