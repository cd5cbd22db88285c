/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::Error;
use chrono::{DateTime, Utc};
use sync_core::CanonicalValue;

/// Renders any value in its canonical string form for `concat`/`coalesce`:
/// null becomes an empty string, numbers use their natural decimal form,
/// strings pass through unchanged.
pub fn to_display_string(v: &CanonicalValue) -> String {
    match v {
        CanonicalValue::Null => String::new(),
        CanonicalValue::String(s) => s.clone(),
        CanonicalValue::Bool(b) => b.to_string(),
        CanonicalValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn as_str(v: &CanonicalValue, func: &str) -> Result<Option<String>, Error> {
    match v {
        CanonicalValue::Null => Ok(None),
        CanonicalValue::String(s) => Ok(Some(s.clone())),
        other => Err(Error::LqlEval(format!(
            "{} expected a string argument, got {}",
            func, other
        ))),
    }
}

fn as_i64(v: &CanonicalValue, func: &str) -> Result<Option<i64>, Error> {
    match v {
        CanonicalValue::Null => Ok(None),
        CanonicalValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| Error::LqlEval(format!("{} expected an integer argument", func))),
        other => Err(Error::LqlEval(format!(
            "{} expected a numeric argument, got {}",
            func, other
        ))),
    }
}

fn null_or<T>(v: Option<T>, f: impl FnOnce(T) -> CanonicalValue) -> CanonicalValue {
    v.map(f).unwrap_or(CanonicalValue::Null)
}

pub fn call(name: &str, args: &[CanonicalValue]) -> Result<CanonicalValue, Error> {
    match name {
        "upper" => {
            let [s] = require_n(args, name)?;
            Ok(null_or(as_str(s, name)?, |s| {
                CanonicalValue::String(s.to_uppercase())
            }))
        }
        "lower" => {
            let [s] = require_n(args, name)?;
            Ok(null_or(as_str(s, name)?, |s| {
                CanonicalValue::String(s.to_lowercase())
            }))
        }
        "trim" => {
            let [s] = require_n(args, name)?;
            Ok(null_or(as_str(s, name)?, |s| {
                CanonicalValue::String(s.trim().to_string())
            }))
        }
        "length" => {
            let [s] = require_n(args, name)?;
            Ok(null_or(as_str(s, name)?, |s| {
                CanonicalValue::Number((s.chars().count() as i64).into())
            }))
        }
        "concat" => {
            if args.is_empty() {
                return Err(Error::LqlEval("concat requires at least one argument".into()));
            }
            let joined: String = args.iter().map(to_display_string).collect();
            Ok(CanonicalValue::String(joined))
        }
        "coalesce" => {
            if args.is_empty() {
                return Err(Error::LqlEval("coalesce requires at least one argument".into()));
            }
            for arg in args {
                match arg {
                    CanonicalValue::Null => continue,
                    CanonicalValue::String(s) if s.is_empty() => continue,
                    other => return Ok(other.clone()),
                }
            }
            Ok(CanonicalValue::Null)
        }
        "substring" => {
            let [s, start, len] = require_n(args, name)?;
            let (s, start, len) = match (as_str(s, name)?, as_i64(start, name)?, as_i64(len, name)?) {
                (Some(s), Some(start), Some(len)) => (s, start, len),
                _ => return Ok(CanonicalValue::Null),
            };
            let chars: Vec<char> = s.chars().collect();
            if len <= 0 || start as i64 > chars.len() as i64 {
                return Ok(CanonicalValue::String(String::new()));
            }
            let start_idx = (start.max(1) - 1) as usize;
            let end_idx = (start_idx + len as usize).min(chars.len());
            if start_idx >= end_idx {
                return Ok(CanonicalValue::String(String::new()));
            }
            Ok(CanonicalValue::String(chars[start_idx..end_idx].iter().collect()))
        }
        "left" => {
            let [s, n] = require_n(args, name)?;
            let (s, n) = match (as_str(s, name)?, as_i64(n, name)?) {
                (Some(s), Some(n)) => (s, n),
                _ => return Ok(CanonicalValue::Null),
            };
            let chars: Vec<char> = s.chars().collect();
            let take = n.max(0) as usize;
            Ok(CanonicalValue::String(
                chars.into_iter().take(take).collect(),
            ))
        }
        "right" => {
            let [s, n] = require_n(args, name)?;
            let (s, n) = match (as_str(s, name)?, as_i64(n, name)?) {
                (Some(s), Some(n)) => (s, n),
                _ => return Ok(CanonicalValue::Null),
            };
            let chars: Vec<char> = s.chars().collect();
            let take = (n.max(0) as usize).min(chars.len());
            Ok(CanonicalValue::String(
                chars[chars.len() - take..].iter().collect(),
            ))
        }
        "replace" => {
            let [s, a, b] = require_n(args, name)?;
            let (s, a, b) = match (as_str(s, name)?, as_str(a, name)?, as_str(b, name)?) {
                (Some(s), Some(a), Some(b)) => (s, a, b),
                _ => return Ok(CanonicalValue::Null),
            };
            Ok(CanonicalValue::String(s.replace(&a, &b)))
        }
        "dateFormat" => {
            let [s, fmt] = require_n(args, name)?;
            let (s, fmt) = match (as_str(s, name)?, as_str(fmt, name)?) {
                (Some(s), Some(fmt)) => (s, fmt),
                _ => return Ok(CanonicalValue::Null),
            };
            Ok(CanonicalValue::String(format_date(&s, &fmt)?))
        }
        other => Err(Error::LqlEval(format!("unknown function: {}", other))),
    }
}

fn require_n<const N: usize>(args: &[CanonicalValue], func: &str) -> Result<&[CanonicalValue; N], Error> {
    args.try_into()
        .map_err(|_| Error::LqlEval(format!("{} expects {} argument(s), got {}", func, N, args.len())))
}

fn format_date(iso: &str, fmt: &str) -> Result<String, Error> {
    let dt: DateTime<Utc> = DateTime::parse_from_rfc3339(iso)
        .map_err(|e| Error::LqlEval(format!("dateFormat: invalid ISO-8601 timestamp: {}", e)))?
        .with_timezone(&Utc);

    let mut strftime_fmt = String::with_capacity(fmt.len());
    let bytes: Vec<char> = fmt.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let rest: String = bytes[i..].iter().collect();
        let (token, len) = if rest.starts_with("yyyy") {
            ("%Y", 4)
        } else if rest.starts_with("MM") {
            ("%m", 2)
        } else if rest.starts_with("dd") {
            ("%d", 2)
        } else if rest.starts_with("HH") {
            ("%H", 2)
        } else if rest.starts_with("mm") {
            ("%M", 2)
        } else if rest.starts_with("ss") {
            ("%S", 2)
        } else {
            strftime_fmt.push(bytes[i]);
            i += 1;
            continue;
        };
        strftime_fmt.push_str(token);
        i += len;
    }
    Ok(dt.format(&strftime_fmt).to_string())
}
