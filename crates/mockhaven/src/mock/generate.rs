//! Materialization of `@placeholder` tokens in mock templates.
//!
//! A template is ordinary JSON. String values may embed generation tokens
//! (`"@name"`, `"@integer(1,100)"`, `"id-@uuid"`), and object keys may carry
//! a repetition spec (`"items|3"`, `"items|2-5"`) applied to a one-element
//! array template. Unknown tokens pass through verbatim so literal `@`s in
//! payloads survive.

use chrono::{Duration, SecondsFormat, Utc};
use fake::faker::internet::en::{IPv4, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::uuid::UUIDv4;
use fake::Fake;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::{Map, Number, Value};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([a-z_]+)(?:\(([^)]*)\))?").unwrap());

/// Object-key repetition spec: `name|count` or `name|min-max`.
static KEY_SPEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)\|([0-9]+)(?:-([0-9]+))?$").unwrap());

/// Materialize every generation placeholder in a template.
pub fn materialize(template: &Value) -> Value {
    match template {
        Value::Object(map) => materialize_object(map),
        Value::Array(items) => Value::Array(items.iter().map(materialize).collect()),
        Value::String(s) => materialize_string(s),
        other => other.clone(),
    }
}

fn materialize_object(map: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (key, value) in map {
        if let Some(caps) = KEY_SPEC.captures(key) {
            let name = caps[1].to_string();
            let min: usize = caps[2].parse().unwrap_or(1);
            let count = match caps.get(3).and_then(|m| m.as_str().parse::<usize>().ok()) {
                Some(max) if max > min => rand::thread_rng().gen_range(min..=max),
                Some(_) | None => min,
            };

            if let Value::Array(items) = value {
                if items.len() == 1 {
                    let generated = (0..count).map(|_| materialize(&items[0])).collect();
                    out.insert(name, Value::Array(generated));
                    continue;
                }
            }
            out.insert(name, materialize(value));
        } else {
            out.insert(key.clone(), materialize(value));
        }
    }
    Value::Object(out)
}

fn materialize_string(s: &str) -> Value {
    let Some(caps) = TOKEN.captures(s) else {
        return Value::String(s.to_string());
    };

    // A string that is exactly one token keeps the generated type
    // (numbers and booleans stay unquoted).
    if caps.get(0).unwrap().as_str() == s {
        return generate(&caps[1], caps.get(2).map(|m| m.as_str()));
    }

    let replaced = TOKEN.replace_all(s, |caps: &regex::Captures| {
        value_to_text(generate(&caps[1], caps.get(2).map(|m| m.as_str())))
    });
    Value::String(replaced.into_owned())
}

fn generate(name: &str, args: Option<&str>) -> Value {
    let mut rng = rand::thread_rng();
    match name {
        "name" => Value::String(Name().fake()),
        "first_name" => Value::String(FirstName().fake()),
        "last_name" => Value::String(LastName().fake()),
        "email" => Value::String(SafeEmail().fake()),
        "username" => Value::String(Username().fake()),
        "word" => Value::String(Word().fake()),
        "sentence" => Value::String(Sentence(4..10).fake()),
        "paragraph" => Value::String(Paragraph(2..5).fake()),
        "uuid" => {
            let id: uuid::Uuid = UUIDv4.fake();
            Value::String(id.to_string())
        }
        "ip" => Value::String(IPv4().fake()),
        "boolean" => Value::Bool(rng.gen()),
        "integer" => {
            let (min, max) = int_range(args, 0, 100_000);
            Value::Number(Number::from(rng.gen_range(min..=max)))
        }
        "float" => {
            let (min, max) = float_range(args, 0.0, 100.0);
            let value = (rng.gen_range(min..=max) * 100.0).round() / 100.0;
            Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
        }
        "datetime" => {
            let offset = Duration::seconds(rng.gen_range(0..=365 * 86_400));
            Value::String((Utc::now() - offset).to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        // Unknown tokens survive verbatim.
        _ => Value::String(match args {
            Some(args) => format!("@{name}({args})"),
            None => format!("@{name}"),
        }),
    }
}

fn int_range(args: Option<&str>, default_min: i64, default_max: i64) -> (i64, i64) {
    let Some(args) = args else {
        return (default_min, default_max);
    };
    let mut parts = args.split(',').map(|part| part.trim().parse::<i64>());
    match (parts.next(), parts.next()) {
        (Some(Ok(min)), Some(Ok(max))) if min <= max => (min, max),
        (Some(Ok(min)), None) => (min, default_max.max(min)),
        _ => (default_min, default_max),
    }
}

fn float_range(args: Option<&str>, default_min: f64, default_max: f64) -> (f64, f64) {
    let Some(args) = args else {
        return (default_min, default_max);
    };
    let mut parts = args.split(',').map(|part| part.trim().parse::<f64>());
    match (parts.next(), parts.next()) {
        (Some(Ok(min)), Some(Ok(max))) if min <= max => (min, max),
        (Some(Ok(min)), None) => (min, default_max.max(min)),
        _ => (default_min, default_max),
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
