//! Conversions between GenBank locations and [`Location`].

use crate::{
    error::{DnaError, Result},
    interval::{Interval, Location, Strand},
};
use gb_io::seq::Location as GbLocation;

/// Appends the simple parts of `location` in 5'→3' reading order.
///
/// `complement(...)` flips the strand and the order of everything inside it;
/// a range whose end lies before its start runs through the origin of a
/// circle of `seq_len`.
pub fn collect_location_intervals(
    location: &GbLocation,
    reverse: bool,
    seq_len: usize,
    intervals: &mut Vec<Interval>,
) -> Result<()> {
    let strand = if reverse {
        Strand::Reverse
    } else {
        Strand::Forward
    };
    match location {
        GbLocation::Range((from, _), (to, _)) => {
            let from = to_position(*from)?;
            let to = to_position(*to)?;
            if to < from {
                let unrolled = Interval::new(from, to + seq_len, strand);
                intervals.extend(unrolled.split_at_origin(seq_len));
            } else {
                intervals.push(Interval::new(from, to, strand));
            }
        }
        GbLocation::Between(_, to) => {
            let at = to_position(*to)?;
            intervals.push(Interval::new(at, at, strand));
        }
        GbLocation::Complement(inner) => {
            let mut inner_intervals = vec![];
            collect_location_intervals(inner, !reverse, seq_len, &mut inner_intervals)?;
            intervals.extend(inner_intervals.into_iter().rev());
        }
        GbLocation::Join(parts)
        | GbLocation::Order(parts)
        | GbLocation::Bond(parts)
        | GbLocation::OneOf(parts) => {
            for part in parts {
                collect_location_intervals(part, reverse, seq_len, intervals)?;
            }
        }
        GbLocation::External(name, _) => {
            return Err(DnaError::Codec(format!(
                "location refers to another entry ({name})"
            )));
        }
        GbLocation::Gap(_) => {}
    }
    Ok(())
}

fn to_position(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| DnaError::Codec(format!("negative position {value}")))
}

pub fn location_from_genbank(location: &GbLocation, seq_len: usize) -> Result<Location> {
    let mut intervals = vec![];
    collect_location_intervals(location, false, seq_len, &mut intervals)?;
    Location::new(intervals)
}

fn simple_to_genbank(interval: &Interval) -> GbLocation {
    if interval.is_empty() {
        let at = interval.start as i64;
        GbLocation::Between(at - 1, at)
    } else {
        GbLocation::simple_range(interval.start as i64, interval.end as i64)
    }
}

/// All-reverse locations come out as `complement(join(...))` with the parts in
/// ascending order; mixed strands as a join of individually complemented parts.
pub fn location_to_genbank(location: &Location) -> GbLocation {
    let parts = location.parts();
    if parts.len() == 1 {
        let simple = simple_to_genbank(&parts[0]);
        return match parts[0].strand {
            Strand::Forward => simple,
            Strand::Reverse => GbLocation::Complement(Box::new(simple)),
        };
    }
    if parts.iter().all(|p| p.strand.is_reverse()) {
        let inner = parts.iter().rev().map(simple_to_genbank).collect();
        return GbLocation::Complement(Box::new(GbLocation::Join(inner)));
    }
    GbLocation::Join(
        parts
            .iter()
            .map(|p| match p.strand {
                Strand::Forward => simple_to_genbank(p),
                Strand::Reverse => GbLocation::Complement(Box::new(simple_to_genbank(p))),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_ranges_and_reverse_strand() {
        let location = GbLocation::Complement(Box::new(GbLocation::Join(vec![
            GbLocation::simple_range(10, 20),
            GbLocation::simple_range(40, 50),
        ])));
        let parsed = location_from_genbank(&location, 100).unwrap();
        assert_eq!(parsed.parts(), &[
            Interval::reverse(40, 50),
            Interval::reverse(10, 20)
        ]);
        assert_eq!(location_to_genbank(&parsed), location);
    }

    #[test]
    fn origin_spanning_join() {
        let location = GbLocation::Join(vec![
            GbLocation::simple_range(990, 1000),
            GbLocation::simple_range(0, 30),
        ]);
        let parsed = location_from_genbank(&location, 1000).unwrap();
        assert!(parsed.is_origin_split(1000));
        assert_eq!(location_to_genbank(&parsed), location);
    }

    #[test]
    fn wrapped_range_is_split() {
        let location = GbLocation::simple_range(990, 30);
        let parsed = location_from_genbank(&location, 1000).unwrap();
        assert_eq!(parsed.parts(), &[
            Interval::forward(990, 1000),
            Interval::forward(0, 30)
        ]);
    }

    #[test]
    fn point_location() {
        let parsed = location_from_genbank(&GbLocation::Between(4, 5), 10).unwrap();
        assert_eq!(parsed.parts(), &[Interval::forward(5, 5)]);
        assert_eq!(location_to_genbank(&parsed), GbLocation::Between(4, 5));
    }

    #[test]
    fn mixed_strands() {
        let location = Location::new(vec![Interval::forward(0, 5), Interval::reverse(10, 20)]).unwrap();
        let gb = location_to_genbank(&location);
        assert_eq!(location_from_genbank(&gb, 30).unwrap(), location);
        assert!(location_from_genbank(&GbLocation::External("X".to_string(), None), 30).is_err());
    }
}
