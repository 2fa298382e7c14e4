//! Codec graph construction for a folder.
//!
//! The binder allocates one slot per coder input and output across the
//! folder, in declaration order. Packed streams are bound to input slots,
//! bind pairs route outputs to inputs, and resolution forward-chains:
//! repeatedly instantiate a coder whose inputs are all bound, binding its
//! output onward, until the single unconsumed output — the sink — is
//! produced.

use crate::codec::ByteStream;
use crate::{Error, Result};

/// Factory producing a coder's output stream from its bound inputs.
pub type CoderFactory = Box<dyn FnOnce(Vec<ByteStream>) -> Result<ByteStream>>;

struct CoderSlot {
    factory: Option<CoderFactory>,
    first_in: usize,
    num_in: usize,
    out_slot: usize,
}

/// Builds a folder's coder graph and resolves it to a single output.
pub struct Binder {
    coders: Vec<CoderSlot>,
    inputs: Vec<Option<ByteStream>>,
    /// `(in_slot, out_slot)` edges.
    pairs: Vec<(usize, usize)>,
    next_in: usize,
    next_out: usize,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    /// Creates an empty binder.
    pub fn new() -> Self {
        Self {
            coders: Vec::new(),
            inputs: Vec::new(),
            pairs: Vec::new(),
            next_in: 0,
            next_out: 0,
        }
    }

    /// Adds a coder with the given stream arities, allocating its slots in
    /// declaration order.
    ///
    /// Every supported coder produces exactly one output stream; a
    /// multi-output declaration cannot be wired.
    pub fn add_coder(&mut self, num_in: usize, num_out: usize, factory: CoderFactory) -> Result<()> {
        if num_out != 1 {
            return Err(Error::NotSupported("multi-output coder"));
        }

        self.coders.push(CoderSlot {
            factory: Some(factory),
            first_in: self.next_in,
            num_in,
            out_slot: self.next_out,
        });
        self.next_in += num_in;
        self.next_out += num_out;
        for _ in 0..num_in {
            self.inputs.push(None);
        }
        Ok(())
    }

    /// Binds a source stream (a packed stream view) to an input slot.
    pub fn bind_input(&mut self, in_slot: usize, stream: ByteStream) -> Result<()> {
        match self.inputs.get_mut(in_slot) {
            Some(slot) if slot.is_none() => {
                *slot = Some(stream);
                Ok(())
            }
            _ => Err(Error::NotSupported("packed stream binding")),
        }
    }

    /// Records a bind pair: the given output slot feeds the given input
    /// slot.
    pub fn pair(&mut self, in_slot: usize, out_slot: usize) -> Result<()> {
        if in_slot >= self.next_in || out_slot >= self.next_out {
            return Err(Error::NotSupported("bind pair out of range"));
        }
        if self.inputs.get(in_slot).map_or(true, |s| s.is_some())
            || self.pairs.iter().any(|&(i, o)| i == in_slot || o == out_slot)
        {
            return Err(Error::NotSupported("bind pair binding"));
        }
        self.pairs.push((in_slot, out_slot));
        Ok(())
    }

    /// Resolves the graph and returns the sink stream.
    ///
    /// Fails with [`Error::NotSupported`] when an input stays unbound, the
    /// graph has no unique sink, or no progress can be made (a cycle).
    pub fn resolve(mut self) -> Result<ByteStream> {
        // The sink is the one output slot no bind pair consumes.
        let sink_slot = {
            let mut unconsumed = (0..self.next_out)
                .filter(|out| !self.pairs.iter().any(|&(_, o)| o == *out));
            let first = unconsumed
                .next()
                .ok_or(Error::NotSupported("folder has no output"))?;
            if unconsumed.next().is_some() {
                return Err(Error::NotSupported("folder has multiple outputs"));
            }
            first
        };

        let mut sink = None;
        let mut remaining = self.coders.len();

        while remaining > 0 {
            let mut progress = false;

            for c in 0..self.coders.len() {
                if self.coders[c].factory.is_none() {
                    continue;
                }
                let first_in = self.coders[c].first_in;
                let num_in = self.coders[c].num_in;
                let ready = self.inputs[first_in..first_in + num_in]
                    .iter()
                    .all(|s| s.is_some());
                if !ready {
                    continue;
                }

                let streams = self.inputs[first_in..first_in + num_in]
                    .iter_mut()
                    .map(|s| s.take().ok_or(Error::NotSupported("codec graph resolution")))
                    .collect::<Result<Vec<_>>>()?;

                let factory = self.coders[c]
                    .factory
                    .take()
                    .ok_or(Error::NotSupported("codec graph resolution"))?;
                let output = factory(streams)?;

                let out_slot = self.coders[c].out_slot;
                if out_slot == sink_slot {
                    sink = Some(output);
                } else {
                    let &(in_slot, _) = self
                        .pairs
                        .iter()
                        .find(|&&(_, o)| o == out_slot)
                        .ok_or(Error::NotSupported("codec graph resolution"))?;
                    self.inputs[in_slot] = Some(output);
                }

                remaining -= 1;
                progress = true;
            }

            if !progress {
                return Err(Error::NotSupported("codec graph does not resolve"));
            }
        }

        sink.ok_or(Error::NotSupported("codec graph does not resolve"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn source(data: &[u8]) -> ByteStream {
        Box::new(Cursor::new(data.to_vec()))
    }

    /// A factory that passes its single input through.
    fn pass_through() -> CoderFactory {
        Box::new(|mut inputs: Vec<ByteStream>| {
            inputs.pop().ok_or(Error::NotSupported("coder input count"))
        })
    }

    /// A factory that uppercases ASCII from its single input.
    fn uppercase() -> CoderFactory {
        Box::new(|mut inputs: Vec<ByteStream>| {
            let mut data = Vec::new();
            inputs
                .pop()
                .ok_or(Error::NotSupported("coder input count"))?
                .read_to_end(&mut data)?;
            data.make_ascii_uppercase();
            Ok(Box::new(Cursor::new(data)) as ByteStream)
        })
    }

    fn read_all(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_single_coder() {
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.bind_input(0, source(b"hello")).unwrap();

        assert_eq!(read_all(binder.resolve().unwrap()), b"hello");
    }

    #[test]
    fn test_two_coder_chain() {
        // Coder 0 (uppercase) consumes coder 1's output; the packed stream
        // feeds coder 1's input (slot 1). Mirrors a filter-plus-codec
        // folder.
        let mut binder = Binder::new();
        binder.add_coder(1, 1, uppercase()).unwrap();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.bind_input(1, source(b"hello")).unwrap();
        binder.pair(0, 1).unwrap();

        assert_eq!(read_all(binder.resolve().unwrap()), b"HELLO");
    }

    #[test]
    fn test_unbound_input_rejected() {
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();

        assert!(matches!(
            binder.resolve(),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_multiple_sinks_rejected() {
        // Two coders, no bind pair: both outputs are unconsumed.
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.bind_input(0, source(b"a")).unwrap();
        binder.bind_input(1, source(b"b")).unwrap();

        assert!(matches!(binder.resolve(), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        // Two coders feeding each other; the second output is the sink but
        // neither can ever start.
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.pair(0, 1).unwrap();
        binder.pair(1, 0).unwrap();

        assert!(matches!(binder.resolve(), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_multi_output_coder_rejected() {
        let mut binder = Binder::new();
        assert!(matches!(
            binder.add_coder(1, 2, pass_through()),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_double_bind_rejected() {
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();
        binder.bind_input(0, source(b"a")).unwrap();
        assert!(binder.bind_input(0, source(b"b")).is_err());
    }

    #[test]
    fn test_pair_bounds_checked() {
        let mut binder = Binder::new();
        binder.add_coder(1, 1, pass_through()).unwrap();
        assert!(binder.pair(0, 5).is_err());
        assert!(binder.pair(5, 0).is_err());
    }

    #[test]
    fn test_four_input_merge() {
        // A BCJ2-shaped coder: four inputs, one output. The factory
        // concatenates them.
        let concat: CoderFactory = Box::new(|inputs: Vec<ByteStream>| {
            let mut data = Vec::new();
            for mut input in inputs {
                input.read_to_end(&mut data)?;
            }
            Ok(Box::new(Cursor::new(data)) as ByteStream)
        });

        let mut binder = Binder::new();
        binder.add_coder(4, 1, concat).unwrap();
        binder.bind_input(0, source(b"a")).unwrap();
        binder.bind_input(1, source(b"b")).unwrap();
        binder.bind_input(2, source(b"c")).unwrap();
        binder.bind_input(3, source(b"d")).unwrap();

        assert_eq!(read_all(binder.resolve().unwrap()), b"abcd");
    }
}
