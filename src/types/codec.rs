//! Splitting and building of serialized collections and tuples.
//!
//! Layouts follow the CQL native protocol (v4):
//!
//! - list / set: `[i32 n]` followed by `n` elements, each `[i32 len][bytes]`
//! - map: `[i32 n]` followed by `n` key/value pairs, each part `[i32 len][bytes]`
//! - tuple: components `[i32 len][bytes]` back to back, with no count prefix
//!
//! A length of `-1` encodes a null element. Splitting never copies: every
//! element is a slice of the input `Bytes`.

use anyhow::{bail, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Reads one `[i32 len][bytes]` cell, returning `None` for a null cell
fn read_cell(buf: &mut Bytes) -> Result<Option<Bytes>> {
    if buf.remaining() < 4 {
        bail!("Truncated cell: no length");
    }
    let len = buf.get_i32();
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    if buf.remaining() < len {
        bail!(
            "Truncated cell: expected {} bytes but only {} remain",
            len,
            buf.remaining()
        );
    }
    Ok(Some(buf.split_to(len)))
}

fn read_count(buf: &mut Bytes) -> Result<usize> {
    if buf.remaining() < 4 {
        bail!("Truncated collection: no element count");
    }
    let n = buf.get_i32();
    if n < 0 {
        bail!("Invalid collection element count: {}", n);
    }
    Ok(n as usize)
}

fn write_cell(buf: &mut BytesMut, cell: Option<&[u8]>) {
    match cell {
        Some(data) => {
            buf.put_i32(data.len() as i32);
            buf.put_slice(data);
        }
        None => buf.put_i32(-1),
    }
}

/// Split a serialized list or set into its (possibly null) elements
pub fn split_collection(data: &Bytes) -> Result<Vec<Option<Bytes>>> {
    let mut buf = data.clone();
    let n = read_count(&mut buf)?;
    let mut elements = Vec::with_capacity(n.min(buf.remaining() / 4));
    for _ in 0..n {
        elements.push(read_cell(&mut buf)?);
    }
    if buf.has_remaining() {
        bail!("{} trailing bytes after collection", buf.remaining());
    }
    Ok(elements)
}

/// Split a serialized map into key/value pairs
pub fn split_map(data: &Bytes) -> Result<Vec<(Bytes, Bytes)>> {
    let mut buf = data.clone();
    let n = read_count(&mut buf)?;
    let mut entries = Vec::with_capacity(n.min(buf.remaining() / 8));
    for _ in 0..n {
        let Some(key) = read_cell(&mut buf)? else {
            bail!("Null map key");
        };
        let Some(value) = read_cell(&mut buf)? else {
            bail!("Null map value");
        };
        entries.push((key, value));
    }
    if buf.has_remaining() {
        bail!("{} trailing bytes after map", buf.remaining());
    }
    Ok(entries)
}

/// Split a serialized tuple into its (possibly null) components
pub fn split_tuple(data: &Bytes) -> Result<Vec<Option<Bytes>>> {
    let mut buf = data.clone();
    let mut components = Vec::new();
    while buf.has_remaining() {
        components.push(read_cell(&mut buf)?);
    }
    Ok(components)
}

/// Serialize list or set elements
pub fn build_collection<I, B>(elements: I) -> Bytes
where
    I: IntoIterator<Item = Option<B>>,
    B: AsRef<[u8]>,
{
    let elements: Vec<Option<B>> = elements.into_iter().collect();
    let mut buf = BytesMut::new();
    buf.put_i32(elements.len() as i32);
    for element in &elements {
        write_cell(&mut buf, element.as_ref().map(|e| e.as_ref()));
    }
    buf.freeze()
}

/// Serialize map entries
pub fn build_map<I, K, V>(entries: I) -> Bytes
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let entries: Vec<(K, V)> = entries.into_iter().collect();
    let mut buf = BytesMut::new();
    buf.put_i32(entries.len() as i32);
    for (key, value) in &entries {
        write_cell(&mut buf, Some(key.as_ref()));
        write_cell(&mut buf, Some(value.as_ref()));
    }
    buf.freeze()
}

/// Serialize tuple components
pub fn build_tuple<I, B>(components: I) -> Bytes
where
    I: IntoIterator<Item = Option<B>>,
    B: AsRef<[u8]>,
{
    let mut buf = BytesMut::new();
    for component in components {
        write_cell(&mut buf, component.as_ref().map(|c| c.as_ref()));
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_with_null_element() -> Result<()> {
        let data = build_collection(vec![Some(&b"ab"[..]), None, Some(&b""[..])]);
        let elements = split_collection(&data)?;
        assert_eq!(
            elements,
            vec![Some(Bytes::from_static(b"ab")), None, Some(Bytes::new())]
        );
        Ok(())
    }

    #[test]
    fn test_map_entries() -> Result<()> {
        let data = build_map(vec![
            (&b"x"[..], &[0u8, 0, 0, 1][..]),
            (&b"y"[..], &[0u8, 0, 0, 2][..]),
        ]);
        let entries = split_map(&data)?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, Bytes::from_static(b"y"));
        assert_eq!(entries[1].1, Bytes::from_static(&[0, 0, 0, 2]));
        Ok(())
    }

    #[test]
    fn test_empty_tuple_has_no_components() -> Result<()> {
        assert!(split_tuple(&Bytes::new())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        let mut data = build_collection(vec![Some(&b"abcd"[..])]).to_vec();
        data.pop();
        assert!(split_collection(&Bytes::from(data)).is_err());

        assert!(split_tuple(&Bytes::from_static(&[0, 0])).is_err());
        assert!(split_map(&Bytes::from_static(&[0, 0, 0, 1, 255, 255, 255, 255])).is_err());
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut data = build_collection(Vec::<Option<&[u8]>>::new()).to_vec();
        data.push(7);
        assert!(split_collection(&Bytes::from(data)).is_err());
    }
}
