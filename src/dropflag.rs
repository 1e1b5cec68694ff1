//! This module is for testing only

use std::rc::Rc;
use std::cell::RefCell;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Counts its own drops into a shared flag. The default value counts nothing.
#[derive(Default, Clone)]
pub struct Droppable {
    pub dropflag: Option<DropFlag<i32>>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropflag {
            *flag.borrow_mut() += 1;
        }
    }
}

/// Clonable value with data, used where equality matters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tagged {
    pub data: i32,
    pub name: String,
}

impl Tagged {
    pub fn new(data: i32) -> Tagged {
        Tagged { data, name: format!("item-{}", data) }
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(0));
    let droppable = Droppable { dropflag: Some(flag.clone()) };
    assert_eq!(0, *flag.borrow());
    std::mem::drop(droppable);
    assert_eq!(1, *flag.borrow());
}
