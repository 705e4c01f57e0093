//! JSON Pointer (RFC 6901) navigation over parsed documents.
//!
//! Pointers arrive either bare (`/a/b`) or as URI fragments (`#/a/b`, with
//! `%xx` escapes). Tokens are `/`-delimited; `~1` decodes to `/` and `~0`
//! to `~`. The empty pointer targets the root.

use serde_json::Value;

use crate::error::Error;

/// Unescape a single reference token (`~1` -> `/`, `~0` -> `~`).
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Escape a single reference token for embedding in a pointer.
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Percent-decode a URI fragment into raw pointer text.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &s[i + 1..i + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a pointer (optionally written as a `#` fragment) into unescaped
/// reference tokens.
///
/// # Errors
///
/// Returns [`Error::InvalidPointer`] for a non-empty pointer that does not
/// start with `/`.
pub fn parse(pointer: &str) -> Result<Vec<String>, Error> {
    let raw = pointer.strip_prefix('#').unwrap_or(pointer);
    let raw = percent_decode(raw);
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = raw.strip_prefix('/') else {
        return Err(Error::InvalidPointer {
            pointer: pointer.to_string(),
            reason: "must be empty or start with \"/\"".into(),
        });
    };
    Ok(rest.split('/').map(unescape).collect())
}

/// Render tokens back into a pointer string (`""` for the root).
pub fn join(tokens: &[String]) -> String {
    if tokens.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for token in tokens {
        out.push('/');
        out.push_str(&escape(token));
    }
    out
}

/// Canonical decimal array index: no leading zeros (except `0` itself).
fn parse_index(token: &str, pointer: &str) -> Result<usize, Error> {
    if token.len() > 1 && token.starts_with('0') {
        return Err(Error::InvalidPointer {
            pointer: pointer.to_string(),
            reason: format!("array index \"{token}\" has leading zeros"),
        });
    }
    token.parse::<usize>().map_err(|_| Error::InvalidPointer {
        pointer: pointer.to_string(),
        reason: format!("\"{token}\" is not an array index"),
    })
}

/// Walk a pointer into `doc` and return the targeted value.
///
/// `url` is only used for error context.
///
/// # Errors
///
/// Returns [`Error::MissingPointer`] naming the first token that did not
/// match, or [`Error::InvalidPointer`] for malformed pointers.
pub fn get<'a>(doc: &'a Value, pointer: &str, url: &str) -> Result<&'a Value, Error> {
    let tokens = parse(pointer)?;
    let mut current = doc;
    for token in &tokens {
        current = step(current, token, pointer, url)?;
    }
    Ok(current)
}

/// Advance one token from `current`.
pub(crate) fn step<'a>(
    current: &'a Value,
    token: &str,
    pointer: &str,
    url: &str,
) -> Result<&'a Value, Error> {
    let missing = || Error::MissingPointer {
        url: url.to_string(),
        pointer: pointer.to_string(),
        token: token.to_string(),
    };
    match current {
        Value::Object(map) => map.get(token).ok_or_else(missing),
        Value::Array(items) => {
            let idx = parse_index(token, pointer)?;
            items.get(idx).ok_or_else(missing)
        }
        _ => Err(missing()),
    }
}

/// Set `value` at `pointer` inside `doc`, creating missing intermediate
/// objects along the way. Arrays accept existing indices or an append at
/// exactly `len`.
///
/// # Errors
///
/// Returns [`Error::InvalidPointer`] when the pointer is empty or malformed,
/// or [`Error::MissingPointer`] when it descends through a scalar.
pub fn set(doc: &mut Value, pointer: &str, value: Value, url: &str) -> Result<(), Error> {
    let tokens = parse(pointer)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Err(Error::InvalidPointer {
            pointer: pointer.to_string(),
            reason: "cannot set the document root".into(),
        });
    };

    let mut current = doc;
    for token in parents {
        current = match current {
            Value::Object(map) => map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new())),
            Value::Array(items) => {
                let idx = parse_index(token, pointer)?;
                items.get_mut(idx).ok_or_else(|| Error::MissingPointer {
                    url: url.to_string(),
                    pointer: pointer.to_string(),
                    token: token.clone(),
                })?
            }
            _ => {
                return Err(Error::MissingPointer {
                    url: url.to_string(),
                    pointer: pointer.to_string(),
                    token: token.clone(),
                })
            }
        };
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        Value::Array(items) => {
            let idx = parse_index(last, pointer)?;
            if idx < items.len() {
                items[idx] = value;
            } else if idx == items.len() {
                items.push(value);
            } else {
                return Err(Error::MissingPointer {
                    url: url.to_string(),
                    pointer: pointer.to_string(),
                    token: last.clone(),
                });
            }
        }
        _ => {
            return Err(Error::MissingPointer {
                url: url.to_string(),
                pointer: pointer.to_string(),
                token: last.clone(),
            })
        }
    }
    Ok(())
}
