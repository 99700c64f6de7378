//! Title similarity in `[0, 1]`.
//!
//! Three metrics are computed on lower-cased input and the best one wins:
//! normalized edit distance (prefix corruption), Jaro-Winkler (transposed
//! characters) and recursive common-substring coverage (reordered words).

/// Winkler prefix scale `p`.
pub const WINKLER_PREFIX_SCALE: f64 = 0.1;
/// Longest shared prefix the Winkler boost rewards.
pub const WINKLER_PREFIX_CAP: usize = 4;

pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    edit_similarity(&a, &b)
        .max(jaro_winkler(&a, &b))
        .max(common_substring_ratio(&a, &b))
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in characters.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64
}

pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return if b.is_empty() { 1.0 } else { 0.0 };
    }
    if b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if b_matched[j] || *ca != b[j] {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ca != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let jaro = (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64 / 2.0) / m) / 3.0;

    let prefix = a
        .iter()
        .zip(b.iter())
        .take(WINKLER_PREFIX_CAP)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * WINKLER_PREFIX_SCALE * (1.0 - jaro)
}

/// `2 * matched / (len(a) + len(b))`, where `matched` is the length of the
/// longest common substring plus, recursively, the matches found in the
/// unmatched text to its left and to its right.
pub fn common_substring_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (pos_a, pos_b, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }

    len + matched_chars(&a[..pos_a], &b[..pos_b])
        + matched_chars(&a[pos_a + len..], &b[pos_b + len..])
}

/// First longest common run as `(start in a, start in b, length)`.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let run = a[i..]
                .iter()
                .zip(&b[j..])
                .take_while(|(x, y)| x == y)
                .count();
            if run > best.2 {
                best = (i, j, run);
            }
        }
    }
    best
}
