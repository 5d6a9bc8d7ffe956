use std::collections::HashSet;

use solarman::AddressRange;

use crate::catalog::{Batch, RegisterDescriptor};

/// Greedily merge registers into batches whose span does not exceed `max_span` words
///
/// Registers are sorted by address and de-duplicated by name. Gaps between registers are read
/// along with them as long as the span of the batch stays within the limit. A register that is
/// wider than `max_span` or runs past the end of the address space is skipped.
pub(crate) fn group_registers(descriptors: &[RegisterDescriptor], max_span: u16) -> Vec<Batch> {
    let mut seen = HashSet::new();
    let mut sorted: Vec<&RegisterDescriptor> = descriptors
        .iter()
        .filter(|x| seen.insert(x.name.as_str()))
        .collect();
    sorted.sort_by_key(|x| (x.address, x.words));

    let mut batches: Vec<Batch> = Vec::new();
    let mut current: Option<(u16, u32, Vec<RegisterDescriptor>)> = None;

    for descriptor in sorted {
        if descriptor.words == 0
            || descriptor.words > max_span
            || descriptor.end() > u16::MAX as u32 + 1
        {
            tracing::warn!(
                register = %descriptor.name,
                address = descriptor.address,
                words = descriptor.words,
                "register cannot be read in a single request, skipping"
            );
            continue;
        }

        if let Some((start, end, registers)) = current.as_mut() {
            let new_end = (*end).max(descriptor.end());
            if new_end - *start as u32 <= max_span as u32 {
                *end = new_end;
                registers.push(descriptor.clone());
                continue;
            }
            if let Some(batch) = close(*start, *end, std::mem::take(registers)) {
                batches.push(batch);
            }
        }

        current = Some((descriptor.address, descriptor.end(), vec![descriptor.clone()]));
    }

    if let Some((start, end, registers)) = current {
        if let Some(batch) = close(start, end, registers) {
            batches.push(batch);
        }
    }

    batches
}

fn close(start: u16, end: u32, registers: Vec<RegisterDescriptor>) -> Option<Batch> {
    let count = u16::try_from(end - start as u32).ok()?;
    let range = AddressRange::try_from(start, count).ok()?;
    Some(Batch { range, registers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ValueKind;

    fn register(name: &str, address: u16, words: u16) -> RegisterDescriptor {
        RegisterDescriptor {
            name: name.to_string(),
            description: Some(name.to_string()),
            suffix: None,
            address,
            words,
            kind: ValueKind::RAW,
        }
    }

    fn ranges(batches: &[Batch]) -> Vec<(u16, u16)> {
        batches
            .iter()
            .map(|x| (x.range.start, x.range.count))
            .collect()
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(group_registers(&[], 125).is_empty());
    }

    #[test]
    fn merges_nearby_registers_in_address_order() {
        let batches = group_registers(
            &[register("b", 184, 1), register("a", 183, 1), register("c", 190, 2)],
            125,
        );
        assert_eq!(ranges(&batches), vec![(183, 9)]);
        let names: Vec<&str> = batches[0]
            .registers
            .iter()
            .map(|x| x.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn splits_when_span_exceeds_limit() {
        let batches = group_registers(
            &[register("a", 0, 1), register("b", 9, 1), register("c", 10, 1)],
            10,
        );
        assert_eq!(ranges(&batches), vec![(0, 10), (10, 1)]);
    }

    #[test]
    fn multi_word_register_extends_span() {
        let batches = group_registers(&[register("a", 3, 5), register("b", 5, 1)], 125);
        assert_eq!(ranges(&batches), vec![(3, 5)]);
    }

    #[test]
    fn duplicates_are_read_once() {
        let batches = group_registers(&[register("a", 10, 1), register("a", 10, 1)], 125);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].registers.len(), 1);
    }

    #[test]
    fn skips_registers_that_cannot_be_read() {
        let batches = group_registers(
            &[
                register("wide", 0, 20),
                register("edge", u16::MAX, 2),
                register("ok", 100, 1),
            ],
            10,
        );
        assert_eq!(ranges(&batches), vec![(100, 1)]);
    }
}
