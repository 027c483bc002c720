//! End-to-end tests running real-looking Markdown articles through the
//! normalizer and the chunker together.

use blogthread_text::{DEFAULT_MAX_LENGTH, Segment, chunk, clean};

const ARTICLE: &str = r#"# Rebuilding the garden shed

![The old shed](shed-before.jpg)

Last spring the **old shed** finally gave up. The roof sagged, the door stuck,
and something had been living under the floor for at least a year.

## Planning

I sketched a few options in a [notebook](https://example.com/notebook) and
settled on a simple lean-to design. Nothing fancy, just `2x4` framing.

```text
width:  2.4m
depth:  1.8m
```

> Measure twice, cut once.

---

![Framing done](framing.jpg)

The framing went up over a weekend.
"#;

fn all_images(segments: &[Segment]) -> Vec<&str> {
    segments
        .iter()
        .flat_map(|s| s.images.iter().map(String::as_str))
        .collect()
}

#[test]
fn test_article_fits_in_one_segment() {
    let cleaned = clean(ARTICLE);
    let segments = chunk(&cleaned.text, &cleaned.images, DEFAULT_MAX_LENGTH);

    assert!(!cleaned.text.contains("```"));
    assert!(!cleaned.text.contains("width:"));
    assert!(cleaned.text.contains("notebook and"));
    assert!(cleaned.text.starts_with("Rebuilding the garden shed"));

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, cleaned.text);
    assert_eq!(all_images(&segments), vec!["shed-before.jpg", "framing.jpg"]);
}

#[test]
fn test_article_split_keeps_every_image_once() {
    let cleaned = clean(ARTICLE);
    let segments = chunk(&cleaned.text, &cleaned.images, 80);

    assert!(segments.len() > 3);
    for segment in &segments {
        assert!(segment.text.chars().count() <= 80);
    }
    assert_eq!(all_images(&segments), vec!["shed-before.jpg", "framing.jpg"]);
}

#[test]
fn test_thousand_character_paragraph_splits_on_sentences() {
    let sentence = "Each sentence in this paragraph is short enough to fit on its own. ";
    let paragraph = sentence.repeat(1000 / sentence.len() + 1);
    let cleaned = clean(&paragraph);
    assert!(cleaned.text.len() >= 1000);
    assert!(!cleaned.text.contains("\n\n"));

    let segments = chunk(&cleaned.text, &cleaned.images, DEFAULT_MAX_LENGTH);

    assert!(segments.len() >= 2);
    for segment in &segments {
        assert!(segment.text.chars().count() <= DEFAULT_MAX_LENGTH);
        assert!(segment.text.starts_with("Each sentence"));
    }
}
