//! Observer that records list notifications

use std::cell::RefCell;
use std::rc::Rc;
use xrd_rs::model::{ListEvent, ListObserver, Model, ObjectId};

/// Records every event it receives, with the affected object's name
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<(ListEvent, Option<String>)>,
    /// Object names seen on each resync
    pub resyncs: Vec<Vec<String>>,
}

impl EventRecorder {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }
}

fn name_of(object: &dyn Model) -> Option<String> {
    object.get_value("name").map(|v| v.to_text())
}

impl ListObserver for EventRecorder {
    fn on_list_event(&mut self, event: &ListEvent, object: Option<&dyn Model>) {
        self.events.push((*event, object.and_then(name_of)));
    }

    fn resync(&mut self, entries: &mut dyn Iterator<Item = (ObjectId, &dyn Model)>) {
        self.resyncs
            .push(entries.filter_map(|(_, o)| name_of(o)).collect());
    }
}
