//! Assembled entity instances.

use base64ct::{Base64, Encoding};
use serde_json::{Map, Value as Json};
use trellis_sql::DataType;

use crate::entity::{Entity, FetchValue};
use crate::model::Model;

/// One entity instance: its field values plus one collection slot per
/// requested relation.
///
/// Slots are named after the related table and keep related instances in the
/// order their rows arrived.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    model: &'static Model,
    values: Vec<(&'static str, DataType)>,
    relations: Vec<(&'static str, Vec<Self>)>,
}

impl Record {
    /// The descriptor this record is an instance of.
    #[must_use]
    pub const fn model(&self) -> &'static Model {
        self.model
    }

    /// Value of a declared field, if it was populated.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&DataType> {
        self.values.iter().find(|(name, _)| *name == field).map(|(_, value)| value)
    }

    /// Value of the primary key, if populated.
    #[must_use]
    pub fn primary_key(&self) -> Option<&DataType> {
        self.get(self.model.primary_key)
    }

    /// Populated fields in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &DataType)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Typed access to a field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing or has an incompatible type.
    pub fn fetch<T: FetchValue>(&self, field: &str) -> anyhow::Result<T> {
        T::fetch(self, field)
    }

    /// Related instances loaded under `slot`. `None` if the relation was not
    /// requested.
    #[must_use]
    pub fn related(&self, slot: &str) -> Option<&[Self]> {
        self.relations.iter().find(|(name, _)| *name == slot).map(|(_, records)| records.as_slice())
    }

    /// All relation slots, in request order.
    pub fn relations(&self) -> impl Iterator<Item = (&'static str, &[Self])> {
        self.relations.iter().map(|(name, records)| (*name, records.as_slice()))
    }

    /// Convert into the entity type `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if a field of `E` cannot be read.
    pub fn to_entity<E: Entity>(&self) -> anyhow::Result<E> {
        E::from_record(self)
    }

    /// Convert the records loaded for entity `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if `E` was not joined, or a record cannot be converted.
    pub fn related_entities<E: Entity>(&self) -> anyhow::Result<Vec<E>> {
        let Some(records) = self.related(E::TABLE) else {
            anyhow::bail!("relation `{}` was not loaded on `{}`", E::TABLE, self.model.table);
        };
        records.iter().map(E::from_record).collect()
    }

    pub(crate) fn ensure_slot(&mut self, slot: &'static str) {
        if self.related(slot).is_none() {
            self.relations.push((slot, Vec::new()));
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: &'static str) -> &mut Vec<Self> {
        let index = match self.relations.iter().position(|(name, _)| *name == slot) {
            Some(index) => index,
            None => {
                self.relations.push((slot, Vec::new()));
                self.relations.len() - 1
            }
        };
        &mut self.relations[index].1
    }
}

/// Builds a [`Record`] field by field. Undeclared fields are ignored.
#[derive(Debug)]
pub struct RecordBuilder {
    model: &'static Model,
    values: Vec<(&'static str, DataType)>,
}

impl RecordBuilder {
    #[must_use]
    pub const fn new(model: &'static Model) -> Self {
        Self {
            model,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, field: &str, value: DataType) -> Self {
        let Some(declared) = self.model.fields.iter().copied().find(|name| *name == field) else {
            return self;
        };
        match self.values.iter_mut().find(|(name, _)| *name == declared) {
            Some(entry) => entry.1 = value,
            None => self.values.push((declared, value)),
        }
        self
    }

    #[must_use]
    pub fn build(mut self) -> Record {
        let order = self.model.fields;
        self.values.sort_by_key(|(name, _)| order.iter().position(|field| field == name));
        Record {
            model: self.model,
            values: self.values,
            relations: Vec::new(),
        }
    }
}

/// Render assembled records as a JSON array of objects, relation slots
/// becoming nested arrays. Binary values are base64 encoded.
#[must_use]
pub fn into_json(records: &[Record]) -> Json {
    Json::Array(records.iter().map(record_json).collect())
}

fn record_json(record: &Record) -> Json {
    let mut map = Map::new();
    for (name, value) in record.values() {
        map.insert(name.to_string(), datatype_json(value));
    }
    for (slot, related) in record.relations() {
        map.insert(slot.to_string(), into_json(related));
    }
    Json::Object(map)
}

fn datatype_json(value: &DataType) -> Json {
    match value {
        DataType::Int32(Some(v)) => Json::Number((*v).into()),
        DataType::Int64(Some(v)) => Json::Number((*v).into()),
        DataType::Uint32(Some(v)) => Json::Number((*v).into()),
        DataType::Uint64(Some(v)) => Json::Number((*v).into()),
        DataType::Float(Some(v)) => {
            serde_json::Number::from_f64(f64::from(*v)).map_or(Json::Null, Json::Number)
        }
        DataType::Double(Some(v)) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
        DataType::Boolean(Some(v)) => Json::Bool(*v),
        DataType::Str(Some(v))
        | DataType::Date(Some(v))
        | DataType::Time(Some(v))
        | DataType::Timestamp(Some(v)) => Json::String(v.clone()),
        DataType::Binary(Some(v)) => Json::String(Base64::encode_string(v)),
        _ => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    static NOTES: Model = Model {
        table: "notes",
        primary_key: "id",
        fields: &["id", "body", "blob"],
        has_many: &[],
        has_one: &[],
        belongs_to: &[],
    };

    #[test]
    fn builder_keeps_declared_fields_in_order() {
        let record = RecordBuilder::new(&NOTES)
            .set("body", DataType::Str(Some("hi".to_string())))
            .set("other", DataType::Int64(Some(1)))
            .set("id", DataType::Int64(Some(4)))
            .build();

        let names: Vec<_> = record.values().map(|(name, _)| name).collect();
        assert_eq!(names, ["id", "body"]);
        assert_eq!(record.primary_key(), Some(&DataType::Int64(Some(4))));
        assert!(record.get("other").is_none());
    }

    #[test]
    fn slots() {
        let mut record = RecordBuilder::new(&NOTES).build();
        assert!(record.related("notes").is_none());

        record.ensure_slot("notes");
        assert_eq!(record.related("notes").map(<[Record]>::len), Some(0));

        let child = RecordBuilder::new(&NOTES).set("id", DataType::Int64(Some(1))).build();
        record.slot_mut("notes").push(child);
        record.ensure_slot("notes");
        assert_eq!(record.related("notes").map(<[Record]>::len), Some(1));
        assert_eq!(record.relations().count(), 1);
    }

    #[test]
    fn json_export() {
        let mut record = RecordBuilder::new(&NOTES)
            .set("id", DataType::Int64(Some(1)))
            .set("body", DataType::Str(None))
            .set("blob", DataType::Binary(Some(b"hello".to_vec())))
            .build();
        record.ensure_slot("notes");

        assert_eq!(
            into_json(&[record]),
            json!([{ "id": 1, "body": null, "blob": "aGVsbG8=", "notes": [] }])
        );
    }
}
