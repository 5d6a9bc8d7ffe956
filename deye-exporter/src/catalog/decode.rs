use crate::catalog::{Batch, DecodedRegister, RegisterDescriptor, ValueKind};
use crate::error::DecodeError;
use crate::value::RegisterValue;

/// Slice the words of every register out of a batch response and decode them
pub(crate) fn decode_batch(
    words: &[u16],
    batch: &Batch,
) -> Result<Vec<DecodedRegister>, DecodeError> {
    let expected = batch.range.count as usize;
    if words.len() != expected {
        return Err(DecodeError::WordCountMismatch {
            expected,
            actual: words.len(),
        });
    }

    batch
        .registers
        .iter()
        .map(|descriptor| {
            let outside = || DecodeError::RegisterOutsideBatch {
                name: descriptor.name.clone(),
                address: descriptor.address,
            };
            let offset = descriptor
                .address
                .checked_sub(batch.range.start)
                .ok_or_else(outside)? as usize;
            let slice = words
                .get(offset..offset + descriptor.words as usize)
                .ok_or_else(outside)?;

            Ok(DecodedRegister {
                descriptor: descriptor.clone(),
                value: decode_value(descriptor, slice)?,
            })
        })
        .collect()
}

fn malformed(descriptor: &RegisterDescriptor, reason: String) -> DecodeError {
    DecodeError::Malformed {
        name: descriptor.name.clone(),
        reason,
    }
}

fn expect_words(
    descriptor: &RegisterDescriptor,
    words: &[u16],
    count: usize,
) -> Result<(), DecodeError> {
    if words.len() != count {
        return Err(malformed(
            descriptor,
            format!("{} words where {count} are required", words.len()),
        ));
    }
    Ok(())
}

fn scaled(value: i64, divisor: u32) -> RegisterValue {
    if divisor <= 1 {
        RegisterValue::Integer(value)
    } else {
        RegisterValue::Float(value as f64 / divisor as f64)
    }
}

pub(crate) fn decode_value(
    descriptor: &RegisterDescriptor,
    words: &[u16],
) -> Result<Option<RegisterValue>, DecodeError> {
    let value = match &descriptor.kind {
        ValueKind::Unsigned { divisor, offset } => {
            expect_words(descriptor, words, 1)?;
            scaled(words[0] as i64 + *offset as i64, *divisor)
        }
        ValueKind::Signed { divisor, offset } => {
            expect_words(descriptor, words, 1)?;
            scaled(words[0] as i16 as i64 + *offset as i64, *divisor)
        }
        ValueKind::Unsigned32 { divisor } => {
            expect_words(descriptor, words, 2)?;
            let raw = ((words[1] as u32) << 16) | words[0] as u32;
            scaled(raw as i64, *divisor)
        }
        ValueKind::Bool => {
            expect_words(descriptor, words, 1)?;
            RegisterValue::Bool(words[0] != 0)
        }
        ValueKind::Enum(names) => {
            expect_words(descriptor, words, 1)?;
            let raw = words[0];
            match names.iter().find(|(value, _)| *value == raw) {
                Some((_, name)) => RegisterValue::Text(name.to_string()),
                None => RegisterValue::Text(format!("Unknown ({raw})")),
            }
        }
        ValueKind::Ascii => {
            let text: String = words
                .iter()
                .flat_map(|x| x.to_be_bytes())
                .filter(|x| *x != 0)
                .map(|x| {
                    if x.is_ascii_graphic() || x == b' ' {
                        Ok(x as char)
                    } else {
                        Err(malformed(descriptor, format!("non-printable byte {x:#04X}")))
                    }
                })
                .collect::<Result<_, _>>()?;
            RegisterValue::Text(text.trim().to_string())
        }
        ValueKind::DateTime => {
            expect_words(descriptor, words, 3)?;
            let [year, month] = words[0].to_be_bytes();
            let [day, hour] = words[1].to_be_bytes();
            let [minute, second] = words[2].to_be_bytes();
            if year > 99
                || !(1..=12).contains(&month)
                || !(1..=31).contains(&day)
                || hour > 23
                || minute > 59
                || second > 59
            {
                tracing::debug!(
                    register = %descriptor.name,
                    "clock not set: {:04X} {:04X} {:04X}",
                    words[0],
                    words[1],
                    words[2]
                );
                return Ok(None);
            }
            RegisterValue::Text(format!(
                "20{year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        }
        ValueKind::Faults(messages) => {
            let active: Vec<String> = words
                .iter()
                .enumerate()
                .flat_map(|(index, word)| {
                    (0..16u16)
                        .filter(move |bit| word & (1u16 << *bit) != 0)
                        .map(move |bit| index as u16 * 16 + bit)
                })
                .map(|bit| match messages.iter().find(|(x, _)| *x == bit) {
                    Some((_, message)) => message.to_string(),
                    None => format!("Fault bit {bit}"),
                })
                .collect();
            if active.is_empty() {
                RegisterValue::Text("No faults".to_string())
            } else {
                RegisterValue::Text(active.join(", "))
            }
        }
    };

    Ok(Some(value))
}
