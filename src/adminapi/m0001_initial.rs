use crate::schema::{Field, ModelOptions, OnDelete, Operation, Transition};

pub fn transition() -> Transition {
    Transition::new(super::APP_LABEL, "0001_initial")
        .operation(Operation::create_model(
            "Building",
            vec![
                Field::auto("building_id"),
                Field::char("department_name", 255),
                Field::integer("no_of_floors"),
                Field::integer("no_of_rooms").default(0i64),
            ],
            ModelOptions::default(),
        ))
        .operation(Operation::create_model(
            "Room",
            vec![
                Field::auto("room_id"),
                Field::char("room_no", 20),
                Field::integer("capacity"),
                Field::char("room_type", 50),
                Field::boolean("availability_status").default(true),
                Field::foreign_key("building", "Building", OnDelete::Cascade)
                    .related_name("rooms"),
            ],
            ModelOptions::default(),
        ))
        .operation(Operation::create_model(
            "UserRoomBooking",
            vec![
                Field::auto("user_id"),
                Field::char("user_name", 255),
                Field::char("email", 255).unique(),
                Field::char("password", 255),
            ],
            ModelOptions::default(),
        ))
        .operation(Operation::create_model(
            "Payment",
            vec![
                Field::auto("payment_id"),
                Field::integer("amount"),
                Field::date("payment_date"),
                Field::char("status", 50),
            ],
            ModelOptions::default(),
        ))
        .operation(Operation::create_model(
            "Resource",
            vec![
                Field::auto("resource_id"),
                Field::char("resource_name", 255),
                Field::char("resource_type", 50),
                Field::boolean("availability").default(true),
            ],
            ModelOptions::default().db_table("resources"),
        ))
        .operation(Operation::create_model(
            "Book",
            vec![
                Field::auto("book_id"),
                Field::char("title", 255),
                Field::char("isbn", 13),
            ],
            ModelOptions::default(),
        ))
        .operation(Operation::create_model(
            "Hardware",
            vec![
                Field::auto("hardware_id"),
                Field::char("hardware_name", 255),
                Field::foreign_key("resource", "Resource", OnDelete::Cascade),
            ],
            ModelOptions::default(),
        ))
}
