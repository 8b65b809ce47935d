//! Conversion between workspace geometry and the store's term syntax.
//!
//! A pose travels as `[frame_id, _, [x,y,z], [qx,qy,qz,qw]]`: as Prolog text
//! inside queries and as a JSON array inside solution bindings.  Floats are
//! written with the shortest representation that parses back to the same
//! `f64`, so a pose survives the round trip bit for bit.

use refills_types::{Pose, PoseStamped, Quaternion, Vec3};
use serde_json::{Value, json};
use thiserror::Error;

/// Why a binding could not be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("expected a list, got {0}")]
    NotAList(String),
    #[error("expected {expected} elements, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("element {0} is not a number")]
    NotANumber(usize),
    #[error("expected an atom, got {0}")]
    NotAnAtom(String),
}

/// Render an `f64` as a Prolog float literal.
///
/// Always contains a decimal point so the store never sees an integer.
pub fn prolog_float(value: f64) -> String {
    let text = format!("{value:?}");
    match text.find('e') {
        Some(pos) if !text[..pos].contains('.') => {
            format!("{}.0{}", &text[..pos], &text[pos..])
        }
        _ => text,
    }
}

/// Render `name` as a single-quoted Prolog atom.
pub fn quote_atom(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Undo [`quote_atom`]: drop one surrounding pair of quotes and resolve
/// escapes.  Unquoted atoms pass through unchanged.
pub fn strip_quotes(atom: &str) -> String {
    let Some(inner) = atom
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return atom.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            _ => out.push(c),
        }
    }
    out
}

pub fn pose_to_prolog(pose: &PoseStamped) -> String {
    let p = &pose.pose.position;
    let q = &pose.pose.orientation;
    format!(
        "[{}, _, [{},{},{}], [{},{},{},{}]]",
        quote_atom(&pose.frame_id),
        prolog_float(p.x),
        prolog_float(p.y),
        prolog_float(p.z),
        prolog_float(q.x),
        prolog_float(q.y),
        prolog_float(q.z),
        prolog_float(q.w)
    )
}

/// The binding form of a pose, as the store would return it.
pub fn pose_to_binding(pose: &PoseStamped) -> Value {
    let p = &pose.pose.position;
    let q = &pose.pose.orientation;
    json!([
        quote_atom(&pose.frame_id),
        "_",
        [p.x, p.y, p.z],
        [q.x, q.y, q.z, q.w]
    ])
}

pub fn pose_from_binding(value: &Value) -> Result<PoseStamped, CodecError> {
    let items = as_list(value)?;
    if items.len() != 4 {
        return Err(CodecError::WrongLength {
            expected: 4,
            actual: items.len(),
        });
    }
    let frame_id = atom_from_binding(&items[0])?;
    let position = vec3_from_binding(&items[2])?;
    let [x, y, z, w] = numbers::<4>(&items[3])?;
    Ok(PoseStamped::new(
        frame_id,
        Pose::new(position, Quaternion::new(x, y, z, w)),
    ))
}

pub fn vec3_from_binding(value: &Value) -> Result<Vec3, CodecError> {
    let [x, y, z] = numbers::<3>(value)?;
    Ok(Vec3::new(x, y, z))
}

/// An atom binding with its quotes removed.
pub fn atom_from_binding(value: &Value) -> Result<String, CodecError> {
    value
        .as_str()
        .map(strip_quotes)
        .ok_or_else(|| CodecError::NotAnAtom(value.to_string()))
}

fn as_list(value: &Value) -> Result<&Vec<Value>, CodecError> {
    value
        .as_array()
        .ok_or_else(|| CodecError::NotAList(value.to_string()))
}

fn numbers<const N: usize>(value: &Value) -> Result<[f64; N], CodecError> {
    let items = as_list(value)?;
    if items.len() != N {
        return Err(CodecError::WrongLength {
            expected: N,
            actual: items.len(),
        });
    }
    let mut out = [0.0; N];
    for (i, item) in items.iter().enumerate() {
        out[i] = item.as_f64().ok_or(CodecError::NotANumber(i))?;
    }
    Ok(out)
}
