use crate::model::ObjectId;

/// Ordered set of objects movement rays are tested against
#[derive(Debug, Default, Clone)]
pub struct CollidableSet {
    items: Vec<ObjectId>,
}

impl CollidableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless already present
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.items.push(id);
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.items.iter().position(|&i| i == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.items.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_and_keeps_order() {
        let mut set = CollidableSet::new();
        assert!(set.insert(ObjectId(3)));
        assert!(set.insert(ObjectId(1)));
        assert!(!set.insert(ObjectId(3)));
        assert_eq!(set.as_slice(), &[ObjectId(3), ObjectId(1)]);
    }

    #[test]
    fn remove_then_reinsert_appends() {
        let mut set = CollidableSet::new();
        set.insert(ObjectId(0));
        set.insert(ObjectId(1));
        assert!(set.remove(ObjectId(0)));
        assert!(!set.remove(ObjectId(0)));
        set.insert(ObjectId(0));
        assert_eq!(set.as_slice(), &[ObjectId(1), ObjectId(0)]);
    }
}
