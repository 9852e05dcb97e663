mod test_join_notifies_existing_member;
mod test_room_full;
