use uuid::Uuid;

use super::*;

#[test]
fn first_focus_lands_above_floor() {
    let mut focus = FocusMap::new();
    assert_eq!(focus.bring_to_front(Uuid::new_v4()), FOCUS_FLOOR + 1);
}

#[test]
fn next_z_peeks_without_assigning() {
    let mut focus = FocusMap::new();
    let peek = focus.next_z();
    assert!(focus.is_empty());
    assert_eq!(focus.bring_to_front(Uuid::new_v4()), peek);
}

#[test]
fn repeated_focus_is_strictly_monotonic() {
    let mut focus = FocusMap::new();
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let mut assigned = Vec::new();
    // Same ids repeated, in a scrambled order.
    for i in [0, 1, 0, 2, 3, 3, 1, 0, 2, 2] {
        let z = focus.bring_to_front(ids[i]);
        assert!(assigned.iter().all(|prev| z > *prev), "z {z} not above {assigned:?}");
        assigned.push(z);
    }
}

#[test]
fn resolve_prefers_focus_then_server_then_floor() {
    let mut focus = FocusMap::new();
    let focused = Uuid::new_v4();
    let untouched = Uuid::new_v4();

    assert_eq!(focus.resolve(&untouched, None), FOCUS_FLOOR);
    assert_eq!(focus.resolve(&untouched, Some(3)), 3);

    let z = focus.bring_to_front(focused);
    assert_eq!(focus.resolve(&focused, Some(3)), z);
}

#[test]
fn observe_lifts_next_assignment_above_server_values() {
    let mut focus = FocusMap::new();
    focus.observe(40);
    assert_eq!(focus.bring_to_front(Uuid::new_v4()), 41);
}

#[test]
fn observe_lower_value_is_ignored() {
    let mut focus = FocusMap::new();
    let z = focus.bring_to_front(Uuid::new_v4());
    focus.observe(z - 5);
    assert_eq!(focus.next_z(), z + 1);
}

#[test]
fn forget_keeps_monotonic_high_water() {
    let mut focus = FocusMap::new();
    let a = Uuid::new_v4();
    let z = focus.bring_to_front(a);
    focus.forget(&a);
    assert!(focus.get(&a).is_none());
    assert!(focus.bring_to_front(Uuid::new_v4()) > z);
}

#[test]
fn rekey_moves_assigned_value() {
    let mut focus = FocusMap::new();
    let temp = Uuid::new_v4();
    let real = Uuid::new_v4();
    let z = focus.bring_to_front(temp);

    focus.rekey(&temp, real);
    assert_eq!(focus.get(&real), Some(z));
    assert!(focus.get(&temp).is_none());

    focus.rekey(&Uuid::new_v4(), temp);
    assert!(focus.get(&temp).is_none());
}

#[test]
fn custom_floor_is_respected() {
    let mut focus = FocusMap::with_floor(100);
    assert_eq!(focus.floor(), 100);
    assert_eq!(focus.bring_to_front(Uuid::new_v4()), 101);
}
