//! A minimal bounds-checked cursor over a byte slice.
//!
//! This is the "typed, bounds-checked view" the wire schemas are decoded
//! through: every read either consumes exactly its width and advances, or
//! returns `None` and leaves the cursor where it was, so a decoder can bail
//! out of a half-read struct with `?` instead of panicking on a truncated
//! message.

pub struct Cursor<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	#[inline]
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	#[inline]
	pub fn position(&self) -> usize {
		self.pos
	}

	#[inline]
	pub fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	fn take(&mut self, n: usize) -> Option<&'a [u8]> {
		let end = self.pos.checked_add(n)?;
		let slice = self.buf.get(self.pos..end)?;
		self.pos = end;
		Some(slice)
	}

	pub fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
		self.take(n)
	}

	pub fn skip(&mut self, n: usize) -> Option<()> {
		self.take(n).map(|_| ())
	}

	pub fn u8(&mut self) -> Option<u8> {
		self.take(1).map(|b| b[0])
	}

	pub fn bool(&mut self) -> Option<bool> {
		self.u8().map(|b| b != 0)
	}

	pub fn i16(&mut self) -> Option<i16> {
		self.u16().map(|v| v as i16)
	}

	pub fn u16(&mut self) -> Option<u16> {
		self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
	}

	pub fn u32(&mut self) -> Option<u32> {
		self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
	}

	pub fn u64(&mut self) -> Option<u64> {
		self.take(8).map(|b| u64::from_le_bytes(b.try_into().unwrap()))
	}

	pub fn f32(&mut self) -> Option<f32> {
		self.u32().map(f32::from_bits)
	}

	/// Reads a fixed-width, NUL-padded field as a lossily-decoded string,
	/// trimming everything from the first NUL byte onward.
	pub fn fixed_str(&mut self, n: usize) -> Option<String> {
		let bytes = self.take(n)?;
		let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
		Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
	}

	/// Reads a `u16`-length-prefixed string.
	pub fn prefixed_str(&mut self) -> Option<String> {
		let len = self.u16()? as usize;
		let bytes = self.take(len)?;
		Some(String::from_utf8_lossy(bytes).into_owned())
	}
}
