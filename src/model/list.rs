//! Observable object lists
//!
//! [`ObjectList`] owns the objects of a list-valued model property and tells
//! registered observers about every insertion, removal and property change.
//! Observers are held weakly: dropping the presenter that owns an observer
//! is enough to detach it.
//!
//! An observer that is already borrowed when an event fires misses that
//! event. It is marked stale and gets [`ListObserver::resync`] with the full
//! list instead of the next event, or on [`ObjectList::sync_observers`].

use crate::error::{Result, XrdError};
use crate::model::{Model, ModelType, Schema};
use crate::types::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an object held by an [`ObjectList`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Handle returned by [`ObjectCollection::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Change notification emitted by an [`ObjectList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// An object was inserted at `index`
    Inserted { id: ObjectId, index: usize },
    /// A property of an object changed
    Changed {
        id: ObjectId,
        property: &'static str,
    },
    /// An object was removed
    Removed { id: ObjectId },
}

impl ListEvent {
    pub fn object_id(&self) -> ObjectId {
        match *self {
            ListEvent::Inserted { id, .. }
            | ListEvent::Changed { id, .. }
            | ListEvent::Removed { id } => id,
        }
    }
}

/// Receives list notifications
///
/// `object` is the affected object for insertions and changes, `None` for
/// removals.
pub trait ListObserver {
    fn on_list_event(&mut self, event: &ListEvent, object: Option<&dyn Model>);

    /// Rebuild from the current list contents after missed events
    fn resync(&mut self, entries: &mut dyn Iterator<Item = (ObjectId, &dyn Model)>);
}

struct ObserverSlot {
    id: ObserverId,
    observer: Weak<RefCell<dyn ListObserver>>,
    stale: bool,
}

/// Type-erased view of an [`ObjectList`]
pub trait ObjectCollection {
    fn element_schema(&self) -> &'static Schema;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Objects in list order
    fn entries(&self) -> Box<dyn Iterator<Item = (ObjectId, &dyn Model)> + '_>;
    fn object(&self, id: ObjectId) -> Option<&dyn Model>;
    fn subscribe(&mut self, observer: Weak<RefCell<dyn ListObserver>>) -> ObserverId;
    fn unsubscribe(&mut self, id: ObserverId) -> bool;
}

/// Ordered, observable list of model objects
pub struct ObjectList<T> {
    entries: Vec<(ObjectId, T)>,
    observers: Vec<ObserverSlot>,
    next_observer: u32,
}

impl<T: ModelType> ObjectList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live observers
    pub fn observer_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|slot| slot.observer.strong_count() > 0)
            .count()
    }

    /// Number of live observers waiting for a resync
    pub fn stale_observers(&self) -> usize {
        self.observers
            .iter()
            .filter(|slot| slot.stale && slot.observer.strong_count() > 0)
            .count()
    }

    /// Resync observers that missed events, where they can be borrowed now
    pub fn sync_observers(&mut self) {
        self.observers.retain(|slot| slot.observer.strong_count() > 0);
        for slot in self.observers.iter_mut().filter(|slot| slot.stale) {
            let Some(observer) = slot.observer.upgrade() else {
                continue;
            };
            if let Ok(mut observer) = observer.try_borrow_mut() {
                let mut entries = self.entries.iter().map(|(id, o)| (*id, o as &dyn Model));
                observer.resync(&mut entries);
                slot.stale = false;
            };
        }
    }

    /// Append an object, returning its identity
    pub fn push(&mut self, object: T) -> ObjectId {
        let index = self.entries.len();
        self.insert(index, object)
    }

    /// Insert an object at `index` (clamped to the list length)
    pub fn insert(&mut self, index: usize, object: T) -> ObjectId {
        let id = ObjectId::next();
        let index = index.min(self.entries.len());
        self.entries.insert(index, (id, object));
        self.notify(ListEvent::Inserted { id, index });
        id
    }

    /// Remove an object; unknown ids are ignored
    pub fn remove(&mut self, id: ObjectId) -> Option<T> {
        let index = self.position(id)?;
        let (_, object) = self.entries.remove(index);
        self.notify(ListEvent::Removed { id });
        Some(object)
    }

    /// Remove every object, notifying once per object
    pub fn clear(&mut self) {
        while let Some((id, _)) = self.entries.last() {
            let id = *id;
            self.remove(id);
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, o)| o)
    }

    pub fn position(&self, id: ObjectId) -> Option<usize> {
        self.entries.iter().position(|(i, _)| *i == id)
    }

    pub fn id_at(&self, index: usize) -> Option<ObjectId> {
        self.entries.get(index).map(|(id, _)| *id)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.entries.iter().map(|(id, o)| (*id, o))
    }

    /// Set a property on an object and notify observers
    pub fn set(&mut self, id: ObjectId, property: &str, value: Value) -> Result<()> {
        let descriptor = T::type_schema().property(property).ok_or_else(|| {
            XrdError::Configuration(format!(
                "{} has no property '{}'",
                T::type_schema().type_name(),
                property
            ))
        })?;
        let index = self
            .position(id)
            .ok_or_else(|| XrdError::Configuration(format!("{:?} is not in this list", id)))?;
        self.entries[index].1.set_value(descriptor.name, value)?;
        self.notify(ListEvent::Changed {
            id,
            property: descriptor.name,
        });
        Ok(())
    }

    /// Mutate an object directly, then notify a change of `property`
    pub fn update<R>(
        &mut self,
        id: ObjectId,
        property: &'static str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let index = self.position(id)?;
        let result = f(&mut self.entries[index].1);
        self.notify(ListEvent::Changed { id, property });
        Some(result)
    }

    fn notify(&mut self, event: ListEvent) {
        self.observers.retain(|slot| slot.observer.strong_count() > 0);
        let object = match event {
            ListEvent::Removed { .. } => None,
            _ => self
                .entries
                .iter()
                .find(|(id, _)| *id == event.object_id())
                .map(|(_, o)| o as &dyn Model),
        };
        for slot in &mut self.observers {
            let Some(observer) = slot.observer.upgrade() else {
                continue;
            };
            let Ok(mut observer) = observer.try_borrow_mut() else {
                tracing::debug!("Observer {:?} is busy during {:?}, marking stale", slot.id, event);
                slot.stale = true;
                continue;
            };
            if slot.stale {
                let mut entries = self.entries.iter().map(|(id, o)| (*id, o as &dyn Model));
                observer.resync(&mut entries);
                slot.stale = false;
            } else {
                observer.on_list_event(&event, object);
            }
        }
    }
}

impl<T: ModelType> Default for ObjectList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ModelType> From<Vec<T>> for ObjectList<T> {
    fn from(objects: Vec<T>) -> Self {
        objects.into_iter().collect()
    }
}

impl<T: ModelType> FromIterator<T> for ObjectList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for object in iter {
            list.push(object);
        }
        list
    }
}

impl<T: ModelType + fmt::Debug> fmt::Debug for ObjectList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<T: ModelType> ObjectCollection for ObjectList<T> {
    fn element_schema(&self) -> &'static Schema {
        T::type_schema()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (ObjectId, &dyn Model)> + '_> {
        Box::new(self.entries.iter().map(|(id, o)| (*id, o as &dyn Model)))
    }

    fn object(&self, id: ObjectId) -> Option<&dyn Model> {
        self.get(id).map(|o| o as &dyn Model)
    }

    fn subscribe(&mut self, observer: Weak<RefCell<dyn ListObserver>>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(ObserverSlot {
            id,
            observer,
            stale: false,
        });
        id
    }

    fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|slot| slot.id != id);
        self.observers.len() < before
    }
}

impl<T: ModelType + Serialize> Serialize for ObjectList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(_, o)| o))
    }
}

impl<'de, T: ModelType + Deserialize<'de>> Deserialize<'de> for ObjectList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(ObjectList::from)
    }
}
