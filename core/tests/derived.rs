//! Revision-keyed memo.

use finguard_core::derived::Derived;

#[test]
fn builds_once_per_key() {
    let mut memo: Derived<u64, Vec<u64>> = Derived::new();
    assert_eq!(memo.builds(), 0);

    assert_eq!(memo.get(1, || vec![1]), &[1]);
    // Same key: the builder is not called again.
    assert_eq!(memo.get(1, || panic!("rebuilt on an unchanged key")), &[1]);
    assert_eq!(memo.builds(), 1);

    assert_eq!(memo.get(2, || vec![2, 2]), &[2, 2]);
    assert_eq!(memo.builds(), 2);

    // Going back to an older key is still a change.
    assert_eq!(memo.get(1, || vec![1, 1, 1]).len(), 3);
    assert_eq!(memo.builds(), 3);
}
