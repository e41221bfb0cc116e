use rustc_hash::FxHashMap;

use crate::errors::{Result, SceneError};
use crate::geometry::attribute::Attribute;
use crate::geometry::data_list::DataList;

/// Attribute lists of one category, all of length `num_entries`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeListSet {
    num_entries: usize,
    lists: FxHashMap<Attribute, DataList>,
}

impl AttributeListSet {
    #[must_use]
    pub fn new(num_entries: usize) -> Self {
        Self {
            num_entries,
            lists: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Stores `list` under `attribute`, replacing any previous list.
    pub fn set(&mut self, attribute: Attribute, list: DataList) -> Result<()> {
        self.check_length(&attribute, &list)?;
        self.lists.insert(attribute, list);
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, attribute: Attribute, list: DataList) -> Result<Self> {
        self.set(attribute, list)?;
        Ok(self)
    }

    pub fn remove(&mut self, attribute: &Attribute) -> Option<DataList> {
        self.lists.remove(attribute)
    }

    /// Changes the length and drops every list.
    pub fn reset(&mut self, num_entries: usize) {
        self.num_entries = num_entries;
        self.lists.clear();
    }

    /// Copies every list of `other` into `self`. Nothing is copied unless
    /// all of them have the right length.
    pub fn merge_from(&mut self, other: &AttributeListSet) -> Result<()> {
        for (attribute, list) in &other.lists {
            self.check_length(attribute, list)?;
        }
        self.lists
            .extend(other.lists.iter().map(|(a, l)| (a.clone(), l.clone())));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, attribute: &Attribute) -> Option<&DataList> {
        self.lists.get(attribute)
    }

    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.lists.contains_key(attribute)
    }

    /// Stored attributes in a stable order.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut keys: Vec<Attribute> = self.lists.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, &DataList)> {
        self.lists.iter()
    }

    fn check_length(&self, attribute: &Attribute, list: &DataList) -> Result<()> {
        if let DataList::DoubleTuples { width: 0, .. } = list {
            return Err(SceneError::InvalidArgument(format!(
                "attribute '{}': tuple width must be positive",
                attribute.name()
            )));
        }
        if list.len() == self.num_entries {
            return Ok(());
        }
        Err(SceneError::LengthMismatch {
            attribute: attribute.name().to_string(),
            expected: self.num_entries,
            actual: list.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_width_tuples_are_rejected() {
        let mut set = AttributeListSet::new(0);
        let list = DataList::DoubleTuples {
            data: Vec::<f64>::new().into(),
            width: 0,
        };
        let err = set.set(Attribute::Coordinates, list).unwrap_err();
        assert!(matches!(err, SceneError::InvalidArgument(_)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_length_is_checked() {
        let mut set = AttributeListSet::new(3);
        let err = set
            .set(Attribute::RelativeRadii, DataList::doubles(vec![1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::LengthMismatch {
                attribute: "relative radii".into(),
                expected: 3,
                actual: 2
            }
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_reset_discards_lists() {
        let mut set = AttributeListSet::new(2)
            .with(Attribute::Labels, DataList::strings(&["a", "b"]))
            .unwrap();
        set.reset(5);
        assert_eq!(set.num_entries(), 5);
        assert!(set.get(&Attribute::Labels).is_none());
    }

    #[test]
    fn test_merge_is_all_or_nothing() {
        let mut target = AttributeListSet::new(2);
        let mut source = AttributeListSet::new(2)
            .with(Attribute::Labels, DataList::strings(&["a", "b"]))
            .unwrap();
        // Bypass the length check to build an inconsistent source.
        source
            .lists
            .insert(Attribute::PointSize, DataList::doubles(vec![1.0]));

        assert!(target.merge_from(&source).is_err());
        assert!(target.is_empty());
    }
}
