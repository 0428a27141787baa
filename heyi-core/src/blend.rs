//! Score blending and input shaping

use crate::{Score, SignalOutcome};

/// Combine the text score and the image outcome into one confidence.
///
/// An unavailable text score, or an unavailable image score when the page has
/// an image, makes the whole blend unavailable. Two signals are averaged with
/// equal weight; a text-only scan passes the text score through.
pub fn blend(text_score: Score, image: &SignalOutcome, has_image: bool) -> Score {
    let text = match text_score {
        Score::Value(t) => t,
        Score::Unavailable => return Score::Unavailable,
    };

    if !has_image {
        return Score::Value(text);
    }

    match image.score {
        Score::Value(i) => Score::Value((text + i) / 2.0),
        Score::Unavailable => Score::Unavailable,
    }
}

/// Keep at most `max_chars` characters, always taking the prefix
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
