//! FSST (Fast Static Symbol Table) string compression (§4.6), used for the
//! compressed-dictionary string layout.
//!
//! A symbol table holds up to 255 symbols of 1..=8 bytes each. The wire
//! header is one varint length per symbol, conventionally grouped by length
//! in the order `[2, 3, 4, 5, 6, 7, 8, 1]`; the decoder only needs the
//! per-symbol lengths in whatever order they were written to split the
//! concatenated symbol bytes back into symbols -- the grouping is an encoder
//! convention, not something decode depends on. Compressed bytes are either a
//! symbol code (index into the table) or the escape byte `255` followed by
//! one literal raw byte.

use std::collections::HashMap;

use crate::error::{Error, Result};

const ESCAPE: u8 = 255;
const MAX_SYMBOLS: usize = 255;
const LENGTH_CLASSES: [usize; 8] = [2, 3, 4, 5, 6, 7, 8, 1];

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Symbols in code-assignment order: code `i` is `symbols[i]`.
    symbols: Vec<Vec<u8>>,
}

impl SymbolTable {
    /// Reconstruct a symbol table from the `LENGTH/SYMBOL` per-symbol
    /// lengths (one varint per symbol, in wire order) and the concatenated
    /// `DATA/FSST` symbol bytes. Code `i` is assigned to the `i`-th length
    /// in this list, so whatever order the encoder wrote is preserved.
    pub fn decode(lengths: &[u32], symbol_bytes: &[u8]) -> Result<Self> {
        if lengths.len() > MAX_SYMBOLS {
            return Err(Error::metadata_mismatch(format!(
                "FSST symbol table declares {} symbols, at most {} are addressable",
                lengths.len(), MAX_SYMBOLS
            )));
        }

        let mut symbols = Vec::with_capacity(lengths.len());
        let mut offset = 0;

        for &length in lengths {
            let length = length as usize;

            if length == 0 || length > 8 {
                return Err(Error::metadata_mismatch(format!(
                    "FSST symbol length {} out of range [1, 8]", length
                )));
            }

            if offset + length > symbol_bytes.len() {
                return Err(Error::end_of_buffer(
                    "FSST symbol table bytes ran out before all declared symbols were read",
                ));
            }

            symbols.push(symbol_bytes[offset..offset + length].to_vec());
            offset += length;
        }

        if offset != symbol_bytes.len() {
            return Err(Error::trailing_bytes(format!(
                "FSST symbol table consumed {} of {} symbol bytes", offset, symbol_bytes.len()
            )));
        }

        Ok(SymbolTable { symbols })
    }

    /// Per-symbol lengths and concatenated bytes, in the table's own order --
    /// `build_symbol_table` already arranges that order by length class, so
    /// this is a straight dump rather than a re-sort.
    pub fn encode(&self) -> (Vec<u32>, Vec<u8>) {
        let lengths = self.symbols.iter().map(|symbol| symbol.len() as u32).collect();
        let bytes = self.symbols.concat();
        (lengths, bytes)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Where a symbol of `length` sorts in the conventional wire grouping
/// `[2, 3, 4, 5, 6, 7, 8, 1]`.
fn length_class_rank(length: usize) -> usize {
    LENGTH_CLASSES.iter().position(|&class| class == length).unwrap_or(LENGTH_CLASSES.len())
}

/// Decode FSST-compressed bytes back into their original plaintext.
pub fn decode(compressed: &[u8], table: &SymbolTable) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(compressed.len() * 2);
    let mut i = 0;

    while i < compressed.len() {
        let code = compressed[i];

        if code == ESCAPE {
            let literal = *compressed.get(i + 1).ok_or_else(|| {
                Error::end_of_buffer("FSST escape byte at end of compressed stream with no literal following")
            })?;
            out.push(literal);
            i += 2;
        } else {
            let symbol = table.symbols.get(code as usize).ok_or_else(|| {
                Error::geometry(format!("FSST code {} has no matching symbol in the table", code))
            })?;
            out.extend_from_slice(symbol);
            i += 1;
        }
    }

    Ok(out)
}

/// Build a symbol table from a training corpus by greedily counting
/// frequently-repeated byte n-grams (length 2..=8) and keeping the
/// highest-value (frequency * length) non-overlapping candidates, then
/// compress `corpus` against it.
///
/// This crate's encoder always runs this path rather than emitting the
/// single-dictionary layout unconditionally; callers choose between layouts
/// by comparing output sizes, matching the encoder strategy described for
/// the integer codec in §4.4.2.
pub fn build_and_compress(corpus: &[u8]) -> (SymbolTable, Vec<u8>) {
    let table = build_symbol_table(corpus);
    let compressed = compress(corpus, &table);
    (table, compressed)
}

fn build_symbol_table(corpus: &[u8]) -> SymbolTable {
    let mut counts: HashMap<&[u8], usize> = HashMap::new();

    for length in 2..=8 {
        if corpus.len() < length {
            continue;
        }
        for window in corpus.windows(length) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }

    let mut candidates: Vec<(&[u8], usize)> = counts.into_iter().filter(|&(_, count)| count >= 2).collect();
    candidates.sort_by_key(|&(symbol, count)| std::cmp::Reverse(count * symbol.len()));

    let mut symbols: Vec<Vec<u8>> = candidates
        .into_iter()
        .take(MAX_SYMBOLS)
        .map(|(symbol, _)| symbol.to_vec())
        .collect();

    // group by length in the conventional wire order; stable sort keeps the
    // frequency*length ranking within each length class
    symbols.sort_by_key(|symbol| length_class_rank(symbol.len()));

    SymbolTable { symbols }
}

fn compress(plaintext: &[u8], table: &SymbolTable) -> Vec<u8> {
    let mut by_length: Vec<Vec<(usize, &[u8])>> = vec![Vec::new(); 9];
    for (code, symbol) in table.symbols.iter().enumerate() {
        by_length[symbol.len()].push((code, symbol));
    }

    let mut out = Vec::with_capacity(plaintext.len());
    let mut i = 0;

    'outer: while i < plaintext.len() {
        for length in (1..=8usize.min(plaintext.len() - i)).rev() {
            for &(code, symbol) in &by_length[length] {
                if &plaintext[i..i + length] == symbol {
                    out.push(code as u8);
                    i += length;
                    continue 'outer;
                }
            }
        }

        out.push(ESCAPE);
        out.push(plaintext[i]);
        i += 1;
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_repetitive_corpus() {
        let corpus = b"residential residential residential service service footway";
        let (table, compressed) = build_and_compress(corpus);

        assert!(compressed.len() < corpus.len());

        let decoded = decode(&compressed, &table).unwrap();
        assert_eq!(decoded, corpus);
    }

    #[test]
    fn escapes_bytes_with_no_symbol_match() {
        let table = SymbolTable::default();
        let compressed: Vec<u8> = b"xy".iter().flat_map(|&b| [ESCAPE, b]).collect();
        let decoded = decode(&compressed, &table).unwrap();
        assert_eq!(decoded, b"xy");
    }

    #[test]
    fn symbol_table_round_trips_through_wire_layout() {
        let table = SymbolTable {
            symbols: vec![b"ab".to_vec(), b"cde".to_vec(), b"x".to_vec(), b"residen".to_vec()],
        };

        let (lengths, bytes) = table.encode();
        let decoded = SymbolTable::decode(&lengths, &bytes).unwrap();

        assert_eq!(decoded.symbols, table.symbols);
    }

    #[test]
    fn truncated_symbol_bytes_fail() {
        assert!(SymbolTable::decode(&[1], b"").is_err());
    }

    #[test]
    fn decodes_the_reference_dictionary_scenario() {
        // S6 from the spec's end-to-end scenarios.
        let lengths = [2, 2, 2, 1, 1, 1, 1, 1, 1];
        let bytes = [65, 65, 69, 69, 100, 100, 65, 66, 67, 69, 100, 102];
        let table = SymbolTable::decode(&lengths, &bytes).unwrap();

        let payload = [
            0, 0, 0, 3, 4, 4, 4, 0, 3, 5, 5, 2, 2, 7, 1, 1, 1, 8, 8, 8, 1, 1, 0, 0, 3, 2, 2, 5, 5,
        ];
        let decoded = decode(&payload, &table).unwrap();

        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "AAAAAAABBBAAACCdddddEEEEEEfffEEEEAAAAAddddCC"
        );
    }

    #[test]
    fn builder_assigns_codes_in_length_class_order() {
        let corpus = b"aaaaaaaaaabbbbbbbbbbccccccccccresidentialresidentialresidential";
        let table = build_symbol_table(corpus);

        let mut last_rank = 0;
        for symbol in &table.symbols {
            let rank = length_class_rank(symbol.len());
            assert!(rank >= last_rank, "symbols must be grouped by length class order");
            last_rank = rank;
        }
    }
}
