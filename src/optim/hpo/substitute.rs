//! Apply sampled parameters onto a model definition
//!
//! A sample such as `{"combiner.num_fc_layers": 3, "utterance.cell_type": "gru"}`
//! is first nested by splitting names on `.` and then merged one level deep
//! into the matching sections: every input and output feature (matched by its
//! `name`), `combiner`, `training` and `preprocessing`.

use serde_json::{Map, Value};

use crate::config::{feature_name, ModelDefinition, Section};

use super::types::Sample;

/// Nest dotted parameter names: `a.b.c = v` becomes `{a: {b: {c: v}}}`.
///
/// Names are visited in sorted order, so a longer path that extends a shorter
/// one replaces the shorter one's scalar leaf with a mapping.
pub fn parse_parameters(sample: &Sample) -> Map<String, Value> {
    let mut nested = Map::new();
    for (name, value) in sample {
        let path: Vec<&str> = name.split('.').collect();
        insert_path(&mut nested, &path, value.clone().into());
    }
    nested
}

fn insert_path(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            map.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Merge `sample` into `definition` in place
pub fn apply_parameters(definition: &mut ModelDefinition, sample: &Sample) {
    if sample.is_empty() {
        return;
    }
    let params = parse_parameters(sample);

    let features = definition
        .input_features
        .iter_mut()
        .chain(definition.output_features.iter_mut());
    for feature in features {
        let overrides = feature_name(feature).and_then(|name| params.get(name)).cloned();
        if let Some(Value::Object(overrides)) = overrides {
            merge_section(feature, &overrides);
        }
    }

    let sections = [
        ("combiner", &mut definition.combiner),
        ("training", &mut definition.training),
        ("preprocessing", &mut definition.preprocessing),
    ];
    for (key, section) in sections {
        if let Some(Value::Object(overrides)) = params.get(key) {
            merge_section(section, overrides);
        }
    }
}

/// Deep copy of `definition` with `sample` applied; the base is untouched
pub fn substitute_parameters(definition: &ModelDefinition, sample: &Sample) -> ModelDefinition {
    let mut copy = definition.clone();
    apply_parameters(&mut copy, sample);
    copy
}

/// Scalars overwrite; mappings overwrite per sub-key.
fn merge_section(section: &mut Section, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match value {
            Value::Object(nested) => {
                let target = section
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !target.is_object() {
                    *target = Value::Object(Map::new());
                }
                if let Value::Object(target) = target {
                    for (sub_key, sub_value) in nested {
                        target.insert(sub_key.clone(), sub_value.clone());
                    }
                }
            }
            _ => {
                section.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::hpo::types::ParameterValue;
    use serde_json::json;

    fn base() -> ModelDefinition {
        serde_yaml::from_str(
            r#"
input_features:
  - name: utterance
    type: text
    encoder: rnn
    cell_type: lstm
output_features:
  - name: intent
    type: category
    decoder:
      num_fc_layers: 1
      fc_size: 64
combiner:
  type: concat
  num_fc_layers: 1
training:
  learning_rate: 0.001
  epochs: 5
"#,
        )
        .unwrap()
    }

    fn sample(pairs: &[(&str, ParameterValue)]) -> Sample {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_parse_parameters_nests_names() {
        let s = sample(&[
            ("combiner.num_fc_layers", ParameterValue::Int(3)),
            ("training.learning_rate", ParameterValue::Float(0.01)),
            ("intent.decoder.fc_size", ParameterValue::Int(128)),
        ]);
        let nested = Value::Object(parse_parameters(&s));
        assert_eq!(
            nested,
            json!({
                "combiner": {"num_fc_layers": 3},
                "training": {"learning_rate": 0.01},
                "intent": {"decoder": {"fc_size": 128}},
            })
        );
    }

    #[test]
    fn test_parse_parameters_longer_path_wins() {
        let s = sample(&[
            ("training.optimizer", ParameterValue::Categorical("adam".into())),
            ("training.optimizer.beta1", ParameterValue::Float(0.9)),
        ]);
        let nested = Value::Object(parse_parameters(&s));
        assert_eq!(nested, json!({"training": {"optimizer": {"beta1": 0.9}}}));
    }

    #[test]
    fn test_parse_parameters_undotted_name() {
        let s = sample(&[("seed", ParameterValue::Int(7))]);
        assert_eq!(Value::Object(parse_parameters(&s)), json!({"seed": 7}));
    }

    #[test]
    fn test_empty_sample_is_identity() {
        let def = base();
        assert_eq!(substitute_parameters(&def, &Sample::new()), def);
    }

    #[test]
    fn test_substitute_sections_and_features() {
        let def = base();
        let s = sample(&[
            ("combiner.num_fc_layers", ParameterValue::Int(3)),
            ("training.learning_rate", ParameterValue::Float(0.01)),
            ("utterance.cell_type", ParameterValue::Categorical("gru".into())),
            ("intent.decoder.fc_size", ParameterValue::Int(128)),
        ]);
        let out = substitute_parameters(&def, &s);

        assert_eq!(out.combiner.get("num_fc_layers"), Some(&json!(3)));
        assert_eq!(out.combiner.get("type"), Some(&json!("concat")));
        assert_eq!(out.training.get("learning_rate"), Some(&json!(0.01)));
        assert_eq!(out.training.get("epochs"), Some(&json!(5)));
        assert_eq!(out.input_features[0].get("cell_type"), Some(&json!("gru")));
        assert_eq!(
            out.output_features[0].get("decoder"),
            Some(&json!({"num_fc_layers": 1, "fc_size": 128}))
        );
    }

    #[test]
    fn test_substitute_creates_missing_submapping() {
        let s = sample(&[("preprocessing.text.lowercase", ParameterValue::Bool(true))]);
        let out = substitute_parameters(&base(), &s);
        assert_eq!(out.preprocessing.get("text"), Some(&json!({"lowercase": true})));
    }

    #[test]
    fn test_unknown_section_is_ignored() {
        let s = sample(&[("nonexistent.size", ParameterValue::Int(3))]);
        let def = base();
        assert_eq!(substitute_parameters(&def, &s), def);
    }

    #[test]
    fn test_copies_are_isolated() {
        let def = base();
        let a = substitute_parameters(&def, &sample(&[("combiner.num_fc_layers", ParameterValue::Int(2))]));
        let b = substitute_parameters(&def, &sample(&[("combiner.num_fc_layers", ParameterValue::Int(3))]));
        assert_eq!(a.combiner.get("num_fc_layers"), Some(&json!(2)));
        assert_eq!(b.combiner.get("num_fc_layers"), Some(&json!(3)));
        assert_eq!(def.combiner.get("num_fc_layers"), Some(&json!(1)));
    }
}
