//! Sort methods for `order_by`.

use std::cmp::Ordering;

use crate::value::{Value, cmp_f64};

/// How projected sort keys are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMethod {
    /// Loose comparison (numbers numerically, strings lexically).
    #[default]
    Regular,
    /// Compare as numbers; non-numeric values count as zero.
    Numeric,
    /// Compare as strings.
    String,
    /// Natural order: digit runs compare by numeric value (`img2 < img10`).
    Natural,
    /// Natural order ignoring case.
    NaturalCaseInsensitive,
}

impl SortMethod {
    /// Compare two sort keys.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self {
            Self::Regular => a.loose_cmp(b),
            Self::Numeric => cmp_f64(
                a.as_number().unwrap_or(0.0),
                b.as_number().unwrap_or(0.0),
            ),
            Self::String => a.to_php_string().cmp(&b.to_php_string()),
            Self::Natural => natural_cmp(&a.to_php_string(), &b.to_php_string()),
            Self::NaturalCaseInsensitive => natural_cmp(
                &a.to_php_string().to_lowercase(),
                &b.to_php_string().to_lowercase(),
            ),
        }
    }
}

/// Natural-order string comparison.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x_run = digit_run(&mut left);
                let y_run = digit_run(&mut right);
                let x_trimmed = x_run.trim_start_matches('0');
                let y_trimmed = y_run.trim_start_matches('0');
                let ordering = x_trimmed
                    .len()
                    .cmp(&y_trimmed.len())
                    .then_with(|| x_trimmed.cmp(y_trimmed));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Stable merge sort.
///
/// Loose comparisons are not transitive across types. This sort only asks whether
/// the right element goes first, so it always finishes with some stable order.
pub(crate) fn merge_sort_by<T, F>(items: Vec<T>, compare: F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    merge_sort(items, &compare)
}

fn merge_sort<T, F>(items: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

fn digit_run(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("img2", "img10"), Ordering::Less);
        assert_eq!(natural_cmp("img10", "img10"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "b"), Ordering::Less);
        assert_eq!(natural_cmp("x007", "x7"), Ordering::Equal);
        assert_eq!(natural_cmp("file", "file1"), Ordering::Less);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let sorted = merge_sort_by(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')], |x, y| {
            x.0.cmp(&y.0)
        });
        assert_eq!(sorted, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_merge_sort_survives_intransitive_order() {
        let values: Vec<Value> = vec![
            Value::Null,
            (-1).into(),
            0.into(),
            1.into(),
            "".into(),
            "a".into(),
            "10".into(),
            "9a".into(),
            false.into(),
            true.into(),
            2.5.into(),
            "abc".into(),
            " 5".into(),
            f64::NAN.into(),
        ];
        for method in [SortMethod::Regular, SortMethod::Numeric] {
            for rotation in 0..values.len() {
                let mut input = values.clone();
                input.rotate_left(rotation);
                let input = [input.clone(), input].concat();
                let sorted = merge_sort_by(input.clone(), |a, b| method.compare(a, b));
                assert_eq!(sorted.len(), input.len());
            }
        }
    }

    #[test]
    fn test_methods() {
        let ten = Value::from("10");
        let nine = Value::from("9");
        assert_eq!(SortMethod::Regular.compare(&ten, &nine), Ordering::Greater);
        assert_eq!(SortMethod::String.compare(&ten, &nine), Ordering::Less);
        assert_eq!(SortMethod::Numeric.compare(&"abc".into(), &1.into()), Ordering::Less);
        assert_eq!(
            SortMethod::NaturalCaseInsensitive.compare(&"B2".into(), &"b10".into()),
            Ordering::Less
        );
    }
}
