//! Index invariant tests for the output list.

use quill_core::{Indexed, OutputId, OutputList};

#[derive(Debug)]
struct Item {
    id: OutputId,
    index: Option<usize>,
}

impl Item {
    fn new() -> Self {
        Self {
            id: OutputId::next(),
            index: None,
        }
    }
}

impl Indexed for Item {
    fn id(&self) -> OutputId {
        self.id
    }

    fn index(&self) -> Option<usize> {
        self.index
    }

    fn set_index(&mut self, index: Option<usize>) {
        self.index = index;
    }
}

fn assert_indices_match_positions(list: &OutputList<Item>) {
    for (position, item) in list.iter().enumerate() {
        assert_eq!(item.index(), Some(position));
    }
}

#[test]
fn test_indices_stay_contiguous_across_mixed_operations() {
    let mut list = OutputList::new();
    let mut ids = Vec::new();

    for round in 0..12usize {
        let item = Item::new();
        ids.push(item.id());
        list.add(item);

        if round % 3 == 0 {
            let at = round % (list.len() + 1);
            list.push_insertion_point(at).unwrap();
        }
        if round % 4 == 1 && list.insertion_depth() > 0 {
            list.pop_insertion_point().unwrap();
        }
        if round % 5 == 2 {
            let victim = ids.remove(round % ids.len());
            assert!(list.remove(victim).is_some());
        }

        assert_indices_match_positions(&list);
    }

    assert_eq!(list.len(), ids.len());
}

#[test]
fn test_single_insertion_point_example() {
    let mut list = OutputList::new();
    let first = Item::new();
    let second = Item::new();
    let second_id = second.id();
    list.add(first);
    list.add(second);

    list.push_insertion_point(1).unwrap();
    let inserted = Item::new();
    let inserted_id = inserted.id();
    list.add(inserted);

    assert_eq!(list.position(inserted_id), Some(1));
    assert_eq!(list.position(second_id), Some(2));
    assert_eq!(list.find(second_id).and_then(Indexed::index), Some(2));
    assert_indices_match_positions(&list);
}
