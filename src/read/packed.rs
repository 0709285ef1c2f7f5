//! Cursor over one packed run stream.
//!
//! All byte arithmetic for the packed layout lives here. A stream is a
//! sequence of runs, each `value (sizeof(T)) | index width (1) | first
//! absolute index | positive deltas... | zero terminator`, where the index
//! fields use the run's declared width. The cursor rests on the index field
//! it last decoded; the stream is exhausted once fewer than `width` bytes
//! remain past that field, which leaves the final terminator unconsumed and
//! makes `advance` on a finished cursor a no-op.
//!
//! A zero delta is never a coefficient (first indices are absolute and
//! deltas are strictly positive), so reading zero either ends the column or
//! announces the next run's header.

use crate::error::Result;
use crate::format::cursor::{corrupt, read_uint, read_value};
use crate::format::width::validate_width;
use crate::value::MatrixValue;

/// Decoded cursor position inside one packed stream.
#[derive(Debug, Clone, Copy)]
struct PackedState<T> {
    /// Byte offset of the index field most recently decoded.
    pos: usize,
    /// Index byte width of the current run.
    width: usize,
    /// Byte offset of the current run's value field, for in-place rewrites.
    value_pos: usize,
    value: T,
    index: usize,
    first_of_run: bool,
}

fn state_has_more<T>(state: &PackedState<T>, len: usize) -> bool {
    state.pos + state.width < len
}

/// Decode the first run header. Requires a non-empty stream.
fn init_state<T: MatrixValue>(buf: &[u8]) -> Result<PackedState<T>> {
    let value = read_value::<T>(buf, 0, "run value")?;
    let width_pos = T::WIDTH;
    let width_byte = read_uint(buf, width_pos, 1, "run index width")? as u8;
    let width = validate_width(width_byte)?;
    let pos = width_pos + 1;
    let index = decode_index(buf, pos, width)?;
    Ok(PackedState {
        pos,
        width,
        value_pos: 0,
        value,
        index,
        first_of_run: true,
    })
}

fn decode_index(buf: &[u8], pos: usize, width: usize) -> Result<usize> {
    let raw = read_uint(buf, pos, width, "run index")?;
    usize::try_from(raw).map_err(|_| corrupt("run index exceeds the address space"))
}

/// Step to the next coefficient. A zero delta closes the current run: when
/// bytes remain it opens the next run header, otherwise the cursor stays on
/// the final terminator and further calls do nothing.
fn advance_state<T: MatrixValue>(state: &mut PackedState<T>, buf: &[u8]) -> Result<()> {
    if !state_has_more(state, buf.len()) {
        return Ok(());
    }
    state.pos += state.width;
    let delta = read_uint(buf, state.pos, state.width, "run delta")?;
    if delta != 0 {
        let step = usize::try_from(delta).map_err(|_| corrupt("run delta overflows"))?;
        state.index = state
            .index
            .checked_add(step)
            .ok_or_else(|| corrupt("run index overflows"))?;
        state.first_of_run = false;
        return Ok(());
    }
    if state.pos + state.width >= buf.len() {
        // Final terminator: column exhausted.
        return Ok(());
    }
    state.pos += state.width;
    state.value_pos = state.pos;
    state.value = read_value::<T>(buf, state.pos, "run value")?;
    state.pos += T::WIDTH;
    let width_byte = read_uint(buf, state.pos, 1, "run index width")? as u8;
    state.width = validate_width(width_byte)?;
    state.pos += 1;
    state.index = decode_index(buf, state.pos, state.width)?;
    state.first_of_run = true;
    Ok(())
}

/// Read-only cursor over one packed column. `None` input (an empty column)
/// yields an immediately exhausted cursor.
#[derive(Debug)]
pub(crate) struct PackedIter<'a, T: MatrixValue> {
    buf: &'a [u8],
    state: Option<PackedState<T>>,
}

impl<'a, T: MatrixValue> PackedIter<'a, T> {
    pub(crate) fn new(col: Option<&'a [u8]>) -> Result<Self> {
        match col {
            None => Ok(PackedIter {
                buf: &[],
                state: None,
            }),
            Some(buf) => Ok(PackedIter {
                buf,
                state: Some(init_state(buf)?),
            }),
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |state| state_has_more(state, self.buf.len()))
    }

    /// Current run value. Meaningful only while `has_more` holds.
    pub(crate) fn value(&self) -> T {
        self.state.as_ref().map_or_else(T::zero, |state| state.value)
    }

    pub(crate) fn index(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.index)
    }

    pub(crate) fn first_of_run(&self) -> bool {
        self.state.as_ref().map_or(false, |state| state.first_of_run)
    }

    pub(crate) fn advance(&mut self) -> Result<()> {
        match self.state.as_mut() {
            Some(state) => advance_state(state, self.buf),
            None => Ok(()),
        }
    }
}

/// Mutable cursor: same walk as [`PackedIter`] plus in-place rewrites of the
/// current run's value field.
pub(crate) struct PackedIterMut<'a, T: MatrixValue> {
    buf: &'a mut [u8],
    state: Option<PackedState<T>>,
}

impl<'a, T: MatrixValue> PackedIterMut<'a, T> {
    pub(crate) fn new(col: Option<&'a mut [u8]>) -> Result<Self> {
        match col {
            None => Ok(PackedIterMut {
                buf: &mut [],
                state: None,
            }),
            Some(buf) => {
                let state = init_state(buf)?;
                Ok(PackedIterMut {
                    buf,
                    state: Some(state),
                })
            }
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        self.state
            .as_ref()
            .map_or(false, |state| state_has_more(state, self.buf.len()))
    }

    pub(crate) fn value(&self) -> T {
        self.state.as_ref().map_or_else(T::zero, |state| state.value)
    }

    pub(crate) fn index(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.index)
    }

    pub(crate) fn first_of_run(&self) -> bool {
        self.state.as_ref().map_or(false, |state| state.first_of_run)
    }

    /// Rewrite the current run's stored value. Every coefficient of the run
    /// sees the new value, not just the cursor position.
    pub(crate) fn set_value(&mut self, value: T) {
        let valid = self
            .state
            .as_ref()
            .map_or(false, |state| state_has_more(state, self.buf.len()));
        if !valid {
            return;
        }
        if let Some(state) = self.state.as_mut() {
            value.to_le(&mut self.buf[state.value_pos..state.value_pos + T::WIDTH]);
            state.value = value;
        }
    }

    pub(crate) fn advance(&mut self) -> Result<()> {
        match self.state.as_mut() {
            Some(state) => advance_state(state, self.buf),
            None => Ok(()),
        }
    }
}

/// Full decode walk used at the file trust boundary: checks widths, field
/// bounds, and index range, and returns the coefficient count so callers can
/// cross-check metadata.
pub(crate) fn validate_packed<T: MatrixValue>(buf: &[u8], inner_dim: usize) -> Result<usize> {
    let mut state = init_state::<T>(buf)?;
    let mut nnz = 0usize;
    while state_has_more(&state, buf.len()) {
        if state.index >= inner_dim {
            return Err(corrupt(format!(
                "run index {} exceeds inner dimension {}",
                state.index, inner_dim
            )));
        }
        nnz += 1;
        advance_state(&mut state, buf)?;
    }
    Ok(nnz)
}
