#![expect(unsafe_code, reason = "handle-based deletion and element access are unsafe APIs")]

use std::cmp::Ordering;

use oorandom::Rand32;

use moored_skiplist::{Comparator, RingSkiplist};


#[test]
fn owned_elements_survive_splicing_and_teardown() {
    let mut list = RingSkiplist::new();
    let mut handles = Vec::new();

    for word in ["pear", "apple", "quince", "fig", "apple"] {
        handles.push(list.insert(String::from(word)));
    }

    let in_order: Vec<&str> = list.iter().map(String::as_str).collect();
    assert_eq!(in_order, ["apple", "apple", "fig", "pear", "quince"]);

    // SAFETY: the handle is live and deleted exactly once.
    let fig = unsafe { list.delete(handles[3]) };
    assert_eq!(fig, "fig");
    assert_eq!(list.len(), 4);

    // The rest is torn down by `Drop`; the strings' own destructors run there.
}

#[test]
fn comparator_controls_the_order() {
    struct Reverse;

    impl Comparator<u32> for Reverse {
        fn cmp(&self, lhs: &u32, rhs: &u32) -> Ordering {
            rhs.cmp(lhs)
        }
    }

    let mut list = RingSkiplist::with_comparator(Reverse);
    for value in [3_u32, 1, 4, 1, 5, 9, 2, 6] {
        list.insert(value);
    }

    let in_order: Vec<u32> = list.iter().copied().collect();
    assert_eq!(in_order, [9, 6, 5, 4, 3, 2, 1, 1]);

    // SAFETY: `first`/`last` return live handles.
    unsafe {
        assert_eq!(*list.value(list.first().unwrap()), 9);
        assert_eq!(*list.value(list.last().unwrap()), 1);
    }
}

#[test]
fn iterator_is_exact_and_cloneable() {
    let mut list = RingSkiplist::new();
    for value in 0..25_i64 {
        list.insert(value);
    }

    let mut iter = list.iter();
    assert_eq!(iter.len(), 25);

    assert_eq!(iter.next(), Some(&0));
    assert_eq!(iter.len(), 24);

    let forked = iter.clone();
    assert_eq!(iter.collect::<Vec<_>>(), forked.collect::<Vec<_>>());

    let via_into: Vec<i64> = (&list).into_iter().copied().collect();
    assert_eq!(via_into, (0..25).collect::<Vec<_>>());
}

/// Drive the list against a sorted-`Vec` model with a random mix of inserts and
/// handle-deletes, comparing full traversals as it goes.
#[test]
fn matches_a_sorted_model_under_churn() {
    let mut rng = Rand32::new(0x5eed);
    let mut list = RingSkiplist::new();
    let mut model: Vec<(i64, usize)> = Vec::new();
    let mut handles = Vec::new();
    let mut next_id = 0_usize;

    for round in 0..4000 {
        let delete = !model.is_empty() && rng.rand_range(0..3) == 0;

        if delete {
            let pick = rng.rand_range(0..handles.len() as u32) as usize;
            let (handle, id) = handles.swap_remove(pick);

            // SAFETY: each recorded handle is live until this single delete.
            let value = unsafe { list.delete(handle) };

            let position = model
                .iter()
                .position(|&(_, model_id)| model_id == id)
                .expect("model out of sync");
            assert_eq!(model.remove(position).0, value);
        } else {
            let value = i64::from(rng.rand_range(0..64)) - 32;
            let handle = list.insert(value);
            handles.push((handle, next_id));
            model.push((value, next_id));
            next_id += 1;
        }

        if round % 128 == 0 {
            let mut expected: Vec<i64> = model.iter().map(|&(value, _)| value).collect();
            expected.sort_unstable();
            let actual: Vec<i64> = list.iter().copied().collect();
            assert_eq!(actual, expected);
        }
    }

    assert_eq!(list.len(), model.len());
}
