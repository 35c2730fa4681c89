use crate::schema::{Field, Operation, Transition};

pub fn transition() -> Transition {
    Transition::new(super::APP_LABEL, "0002_userroombooking_user_role")
        .depends_on(super::APP_LABEL, "0001_initial")
        .operation(Operation::add_field(
            "UserRoomBooking",
            Field::char("user_role", 20).default("user"),
        ))
}
