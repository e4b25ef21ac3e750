//! Column-wise fit and row-wise transform over the configured attributes

use crate::attribute::{build_attribute, AttributeSimilarity, Encoded, TextAttribute};
use crate::schema::{AttributeDef, AttributeKind};
use crate::text::VectorizerFactory;
use cbrx_core::{CaseTable, Record, Result, Value};
use std::collections::HashMap;

/// One encoded value per configured attribute, in attribute order
pub type EncodedRow = Vec<Encoded>;

/// Applies every attribute's fit over its own column and encodes rows
#[derive(Debug)]
pub struct FeatureTransformer {
    attributes: Vec<Box<dyn AttributeSimilarity>>,
}

impl FeatureTransformer {
    /// Build unfitted attributes from their definitions.
    ///
    /// Text attributes listed in `vectorizers` get a vectorizer from their
    /// factory instead of the default TF-IDF one.
    pub fn new(
        definitions: &[AttributeDef],
        vectorizers: &HashMap<String, VectorizerFactory>,
    ) -> Result<Self> {
        let attributes = definitions
            .iter()
            .map(|def| match (&def.similarity, vectorizers.get(&def.name)) {
                (AttributeKind::Text { vectorizer, undefined }, Some(factory)) => {
                    let attribute: Box<dyn AttributeSimilarity> = Box::new(TextAttribute::new(
                        &def.name,
                        vectorizer.clone(),
                        (**factory)(),
                        undefined,
                    ));
                    Ok(attribute)
                }
                (kind, _) => build_attribute(&def.name, kind),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { attributes })
    }

    pub fn from_attributes(attributes: Vec<Box<dyn AttributeSimilarity>>) -> Self {
        Self { attributes }
    }

    /// Fit every attribute on its column of `table` and return the encoded table
    pub fn fit(&mut self, table: &CaseTable) -> Result<Vec<EncodedRow>> {
        for attribute in self.attributes.iter_mut() {
            let name = attribute.name().to_string();
            let column: Vec<&Value> = table.column(&name).collect();
            attribute.fit(&column)?;
            tracing::debug!(
                attribute = name.as_str(),
                kind = attribute.kind().type_name(),
                rows = column.len(),
                "attribute fitted"
            );
        }
        table.iter().map(|case| self.transform_row(&case.values)).collect()
    }

    pub fn transform_row(&self, record: &Record) -> Result<EncodedRow> {
        self.attributes
            .iter()
            .map(|attribute| attribute.transform(record.get(attribute.name()).unwrap_or(&Value::Null)))
            .collect()
    }

    pub fn transform(&self, records: &[Record]) -> Result<Vec<EncodedRow>> {
        records.iter().map(|r| self.transform_row(r)).collect()
    }

    pub fn attributes(&self) -> &[Box<dyn AttributeSimilarity>] {
        &self.attributes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
