/// Score a document from its error density: 100 with no errors, ten points
/// off per error per hundred words, never below zero.
pub fn grade(error_count: usize, word_count: usize) -> u8 {
    if error_count == 0 {
        return 100;
    }
    if word_count == 0 {
        return 0;
    }
    let per_hundred = error_count as f64 * 100.0 / word_count as f64;
    (100.0 - 10.0 * per_hundred).clamp(0.0, 100.0).round() as u8
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
