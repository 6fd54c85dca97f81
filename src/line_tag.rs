//! Line-dataset tag grammar.
//!
//! A species' absorption-line dataset is named by a positional tag:
//!
//! ```text
//! <formula>_<Isotope><Database><Broadening><Cutoff>[_R_<Resolution>]
//! <formula>_UV
//! ```
//!
//! The attribute block has no separators, so decoding matches each
//! attribute's option table in order. Older documents separate the block with
//! `_` (`O2_main_HN16_HH_Chubb`); those are split on the separator instead and
//! their values are taken verbatim.
//!
//! No attribute value may contain the separator. `LineSelection::new` rejects
//! such values so every encoded tag decodes back to the same selection.

use retrieval_types::{LineAttribute, LINE_TAG_SEPARATOR, RESOLUTION_TOKEN, UV_TOKEN};
use serde::{Deserialize, Serialize};

use crate::error::LineTagError;

/// Maximum tags a species may carry: one main dataset plus one UV dataset.
pub const MAX_TAGS_PER_SPECIES: usize = 2;

/// The five attributes of one line dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSelection {
    isotope: String,
    database: String,
    broadening: String,
    cutoff: String,
    resolution: String,
}

impl Default for LineSelection {
    fn default() -> Self {
        Self {
            isotope: LineAttribute::Isotope.default_value().to_string(),
            database: LineAttribute::Database.default_value().to_string(),
            broadening: LineAttribute::Broadening.default_value().to_string(),
            cutoff: LineAttribute::Cutoff.default_value().to_string(),
            resolution: LineAttribute::Resolution.default_value().to_string(),
        }
    }
}

impl LineSelection {
    pub fn new(
        isotope: impl Into<String>,
        database: impl Into<String>,
        broadening: impl Into<String>,
        cutoff: impl Into<String>,
        resolution: impl Into<String>,
    ) -> Result<Self, LineTagError> {
        Ok(Self {
            isotope: checked_value(LineAttribute::Isotope, isotope.into())?,
            database: checked_value(LineAttribute::Database, database.into())?,
            broadening: checked_value(LineAttribute::Broadening, broadening.into())?,
            cutoff: checked_value(LineAttribute::Cutoff, cutoff.into())?,
            resolution: checked_value(LineAttribute::Resolution, resolution.into())?,
        })
    }

    /// Copy with one attribute replaced.
    pub fn with(
        mut self,
        attribute: LineAttribute,
        value: impl Into<String>,
    ) -> Result<Self, LineTagError> {
        let value = checked_value(attribute, value.into())?;
        *self.slot_mut(attribute) = value;
        Ok(self)
    }

    pub fn get(&self, attribute: LineAttribute) -> &str {
        match attribute {
            LineAttribute::Isotope => &self.isotope,
            LineAttribute::Database => &self.database,
            LineAttribute::Broadening => &self.broadening,
            LineAttribute::Cutoff => &self.cutoff,
            LineAttribute::Resolution => &self.resolution,
        }
    }

    fn slot_mut(&mut self, attribute: LineAttribute) -> &mut String {
        match attribute {
            LineAttribute::Isotope => &mut self.isotope,
            LineAttribute::Database => &mut self.database,
            LineAttribute::Broadening => &mut self.broadening,
            LineAttribute::Cutoff => &mut self.cutoff,
            LineAttribute::Resolution => &mut self.resolution,
        }
    }

    /// Attribute/value pairs in tag order.
    pub fn attributes(&self) -> Vec<(LineAttribute, &str)> {
        LineAttribute::ALL
            .iter()
            .map(|attr| (*attr, self.get(*attr)))
            .collect()
    }

    /// Check every value against its option table.
    ///
    /// Decoding legacy tags keeps values verbatim, so a decoded selection may
    /// hold options that are no longer offered.
    pub fn check_options(&self) -> Result<(), LineTagError> {
        for (attribute, value) in self.attributes() {
            if !attribute.accepts(value) {
                return Err(LineTagError::UnknownOption {
                    attribute,
                    value: value.to_string(),
                    options: attribute.options(),
                });
            }
        }
        Ok(())
    }

    pub fn has_default_resolution(&self) -> bool {
        self.resolution == LineAttribute::Resolution.default_value()
    }
}

fn checked_value(attribute: LineAttribute, value: String) -> Result<String, LineTagError> {
    if value.is_empty() {
        return Err(LineTagError::EmptyValue { attribute });
    }
    if value.contains(LINE_TAG_SEPARATOR) {
        return Err(LineTagError::SeparatorInValue { attribute, value });
    }
    Ok(value)
}

fn check_formula(formula: &str) -> Result<(), LineTagError> {
    if formula.is_empty() || formula.contains(LINE_TAG_SEPARATOR) {
        return Err(LineTagError::InvalidFormula {
            formula: formula.to_string(),
        });
    }
    Ok(())
}

fn resolution_marker() -> String {
    format!("{LINE_TAG_SEPARATOR}{RESOLUTION_TOKEN}{LINE_TAG_SEPARATOR}")
}

/// Encode the main line tag of a species.
///
/// Every value must come from its attribute's option table: the compact block
/// is only decodable by matching those tables. Selections decoded from legacy
/// tags may hold other values and cannot be re-encoded until they are fixed.
pub fn make_line_tag(formula: &str, selection: &LineSelection) -> Result<String, LineTagError> {
    check_formula(formula)?;
    selection.check_options()?;

    let mut tag = format!("{formula}{LINE_TAG_SEPARATOR}");
    for attribute in LineAttribute::POSITIONAL {
        tag.push_str(selection.get(attribute));
    }
    if !selection.has_default_resolution() {
        tag.push_str(&resolution_marker());
        tag.push_str(selection.get(LineAttribute::Resolution));
    }
    Ok(tag)
}

/// Encode the UV cross-section tag of a species.
pub fn make_uv_tag(formula: &str) -> String {
    format!("{formula}{LINE_TAG_SEPARATOR}{UV_TOKEN}")
}

pub fn is_uv_tag(tag: &str) -> bool {
    tag.contains(&format!("{LINE_TAG_SEPARATOR}{UV_TOKEN}"))
}

/// Tag list an editor stores for a species.
///
/// `None` is the "no line" state: the species is left out of opacity
/// calculations and the UV flag has no effect.
pub fn encode_species_lines(
    formula: &str,
    selection: Option<&LineSelection>,
    uv: bool,
) -> Result<Vec<String>, LineTagError> {
    let Some(selection) = selection else {
        return Ok(Vec::new());
    };
    let mut tags = vec![make_line_tag(formula, selection)?];
    if uv {
        tags.push(make_uv_tag(formula));
    }
    Ok(tags)
}

/// Decoded tag list of one species.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLineTags {
    pub selection: Option<LineSelection>,
    pub uv_present: bool,
}

impl ParsedLineTags {
    pub fn is_no_line(&self) -> bool {
        self.selection.is_none() && !self.uv_present
    }
}

/// Decode a species' tag list back into its selection and UV flag.
pub fn parse_line_tags<S: AsRef<str>>(
    tags: &[S],
    formula: &str,
) -> Result<ParsedLineTags, LineTagError> {
    if tags.len() > MAX_TAGS_PER_SPECIES {
        return Err(LineTagError::Malformed {
            reason: format!(
                "{} tags for {}, at most {} allowed",
                tags.len(),
                formula,
                MAX_TAGS_PER_SPECIES
            ),
        });
    }

    let mut parsed = ParsedLineTags::default();
    for tag in tags.iter().map(AsRef::as_ref) {
        if is_uv_tag(tag) {
            if parsed.uv_present {
                return Err(LineTagError::Malformed {
                    reason: format!("more than one UV tag for {formula}"),
                });
            }
            parsed.uv_present = true;
            continue;
        }
        if parsed.selection.is_some() {
            return Err(LineTagError::Malformed {
                reason: format!("more than one main line tag for {formula}"),
            });
        }
        parsed.selection = Some(parse_main_tag(tag, formula)?);
    }
    Ok(parsed)
}

fn parse_main_tag(tag: &str, formula: &str) -> Result<LineSelection, LineTagError> {
    let prefix = format!("{formula}{LINE_TAG_SEPARATOR}");
    let body = tag
        .strip_prefix(&prefix)
        .ok_or_else(|| LineTagError::ForeignSpecies {
            tag: tag.to_string(),
            formula: formula.to_string(),
        })?;

    let marker = resolution_marker();
    let (body, resolution) = match body.rfind(&marker) {
        Some(idx) => (&body[..idx], &body[idx + marker.len()..]),
        None => (body, LineAttribute::Resolution.default_value()),
    };

    let values: Vec<&str> = if body.contains(LINE_TAG_SEPARATOR) {
        body.split(LINE_TAG_SEPARATOR).collect()
    } else {
        split_compact(body, &LineAttribute::POSITIONAL).ok_or_else(|| LineTagError::Malformed {
            reason: format!("cannot split '{body}' into Isotope, Database, Broadening, Cutoff"),
        })?
    };

    let [isotope, database, broadening, cutoff] = values[..] else {
        return Err(LineTagError::Malformed {
            reason: format!(
                "'{tag}' has {} attribute tokens, expected {}",
                values.len(),
                LineAttribute::POSITIONAL.len()
            ),
        });
    };

    LineSelection::new(isotope, database, broadening, cutoff, resolution)
}

/// Split a separator-free attribute block by matching option tables in order.
fn split_compact<'a>(rest: &'a str, attributes: &[LineAttribute]) -> Option<Vec<&'a str>> {
    let Some((attribute, tail)) = attributes.split_first() else {
        return rest.is_empty().then(Vec::new);
    };
    attribute.options().iter().find_map(|option| {
        let remainder = rest.strip_prefix(option)?;
        let mut values = split_compact(remainder, tail)?;
        values.insert(0, &rest[..option.len()]);
        Some(values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn co2_selection(resolution: &str) -> LineSelection {
        LineSelection::new("main", "HN20", "air", "C25", resolution).unwrap()
    }

    #[test]
    fn test_non_default_resolution_is_suffixed() {
        let tag = make_line_tag("CO2", &co2_selection("200")).unwrap();
        assert_eq!(tag, "CO2_mainHN20airC25_R_200");

        let parsed = parse_line_tags(&[tag], "CO2").unwrap();
        assert_eq!(parsed.selection, Some(co2_selection("200")));
        assert!(!parsed.uv_present);
    }

    #[test]
    fn test_default_resolution_is_omitted() {
        let tag = make_line_tag("CO2", &co2_selection("50")).unwrap();
        assert_eq!(tag, "CO2_mainHN20airC25");

        let parsed = parse_line_tags(&[tag.as_str()], "CO2").unwrap();
        assert_eq!(parsed.selection.unwrap().get(LineAttribute::Resolution), "50");
    }

    #[test]
    fn test_uv_tag() {
        assert_eq!(make_uv_tag("O3"), "O3_UV");

        let tags = encode_species_lines("O3", Some(&LineSelection::default()), true).unwrap();
        assert_eq!(tags, vec!["O3_mainHN20airC25", "O3_UV"]);

        let parsed = parse_line_tags(&tags, "O3").unwrap();
        assert!(parsed.uv_present);
        assert_eq!(parsed.selection, Some(LineSelection::default()));
    }

    #[test]
    fn test_no_line_state() {
        let tags = encode_species_lines("N2", None, true).unwrap();
        assert!(tags.is_empty());
        assert!(parse_line_tags(&tags, "N2").unwrap().is_no_line());
    }

    #[test]
    fn test_too_many_tags_is_malformed() {
        let err = parse_line_tags(&["A_tag1", "A_tag2", "A_tag3"], "A").unwrap_err();
        assert!(matches!(err, LineTagError::Malformed { .. }));
    }

    #[test]
    fn test_two_main_tags_is_malformed() {
        let err =
            parse_line_tags(&["CO_mainHN20airC25", "CO_allHN20airC25"], "CO").unwrap_err();
        assert!(matches!(err, LineTagError::Malformed { .. }));

        let err = parse_line_tags(&["CO_UV", "CO_UV"], "CO").unwrap_err();
        assert!(matches!(err, LineTagError::Malformed { .. }));
    }

    #[test]
    fn test_legacy_separated_tags_decode_verbatim() {
        let parsed = parse_line_tags(&["O2_main_HN16_HH_Chubb", "O2_UV"], "O2").unwrap();
        let selection = parsed.selection.unwrap();
        assert_eq!(selection.get(LineAttribute::Database), "HN16");
        assert_eq!(selection.get(LineAttribute::Cutoff), "Chubb");
        assert_eq!(selection.get(LineAttribute::Resolution), "50");
        assert!(matches!(
            selection.check_options(),
            Err(LineTagError::UnknownOption {
                attribute: LineAttribute::Database,
                ..
            })
        ));
    }

    #[test]
    fn test_legacy_tag_with_resolution() {
        let parsed = parse_line_tags(&["H2O_all_EX21_H2O_nocut_R_1000"], "H2O").unwrap();
        let selection = parsed.selection.unwrap();
        assert_eq!(
            selection.attributes(),
            vec![
                (LineAttribute::Isotope, "all"),
                (LineAttribute::Database, "EX21"),
                (LineAttribute::Broadening, "H2O"),
                (LineAttribute::Cutoff, "nocut"),
                (LineAttribute::Resolution, "1000"),
            ]
        );
    }

    #[test]
    fn test_compact_tag_with_overlapping_options() {
        let selection = LineSelection::new("all", "PK95", "CO2", "C100", "100").unwrap();
        let tag = make_line_tag("CO2", &selection).unwrap();
        assert_eq!(tag, "CO2_allPK95CO2C100_R_100");
        assert_eq!(
            parse_line_tags(&[tag], "CO2").unwrap().selection,
            Some(selection)
        );
    }

    #[test]
    fn test_every_option_decodes_back() {
        for attribute in LineAttribute::ALL {
            for option in attribute.options() {
                let selection = LineSelection::default().with(attribute, *option).unwrap();
                let tag = make_line_tag("H2O", &selection).unwrap();
                let parsed = parse_line_tags(&[tag.as_str()], "H2O").unwrap();
                assert_eq!(parsed.selection, Some(selection), "{}", tag);
            }
        }
    }

    #[test]
    fn test_value_outside_options_is_not_encoded() {
        let selection = LineSelection::new("main", "HN16", "HH", "Chubb", "50").unwrap();
        let err = make_line_tag("O2", &selection).unwrap_err();
        assert_eq!(
            err,
            LineTagError::UnknownOption {
                attribute: LineAttribute::Database,
                value: "HN16".into(),
                options: LineAttribute::Database.options(),
            }
        );
        assert!(encode_species_lines("O2", Some(&selection), true).is_err());

        // The same selection still decodes from its legacy spelling.
        let parsed = parse_line_tags(&["O2_main_HN16_HH_Chubb"], "O2").unwrap();
        assert_eq!(parsed.selection, Some(selection));
    }

    #[test]
    fn test_foreign_and_unsplittable_tags() {
        let err = parse_line_tags(&["CH4_mainHN20airC25"], "CO2").unwrap_err();
        assert!(matches!(err, LineTagError::ForeignSpecies { .. }));

        let err = parse_line_tags(&["CO2_mainXX99airC25"], "CO2").unwrap_err();
        assert!(matches!(err, LineTagError::Malformed { .. }));

        let err = parse_line_tags(&["CO2_main_HN20_air"], "CO2").unwrap_err();
        assert!(matches!(err, LineTagError::Malformed { .. }));
    }

    #[test]
    fn test_separator_rejected_at_construction() {
        let err = LineSelection::new("main", "HN_20", "air", "C25", "50").unwrap_err();
        assert_eq!(
            err,
            LineTagError::SeparatorInValue {
                attribute: LineAttribute::Database,
                value: "HN_20".into()
            }
        );

        let err = LineSelection::default()
            .with(LineAttribute::Cutoff, "")
            .unwrap_err();
        assert_eq!(
            err,
            LineTagError::EmptyValue {
                attribute: LineAttribute::Cutoff
            }
        );

        let err = make_line_tag("C_O", &LineSelection::default()).unwrap_err();
        assert!(matches!(err, LineTagError::InvalidFormula { .. }));
    }
}
