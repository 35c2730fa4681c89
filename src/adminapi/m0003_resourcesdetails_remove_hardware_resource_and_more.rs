use crate::schema::{Field, ModelOptions, OnDelete, Operation, Transition};

/// Splits resource details into their own table, adds rents and room policies and drops the
/// `Book` and `Hardware` models
///
/// The order of the operations matters: `Hardware` has to lose its relation to `Resource` before
/// it can be deleted, and `Resources` is referenced before the rename that introduces the name.
pub fn transition() -> Transition {
    Transition::new(
        super::APP_LABEL,
        "0003_resourcesdetails_remove_hardware_resource_and_more",
    )
    .depends_on(super::APP_LABEL, "0002_userroombooking_user_role")
    .operation(Operation::create_model(
        "ResourcesDetails",
        vec![
            Field::one_to_one("resource", "Resources", OnDelete::Cascade)
                .primary_key()
                .related_name("details"),
            Field::char("brand", 255).null(),
            Field::char("device_type", 255).null(),
            Field::char("model_number", 50).null(),
            Field::char("device_condition", 50).null(),
            Field::boolean("warranty_status").null(),
            Field::date("date_purchased").null(),
            Field::char("author", 255).null(),
            Field::char("publisher", 255).null(),
            Field::integer("publication_year").null(),
            Field::integer("edition").null(),
            Field::char("genre", 100).null(),
            Field::char("language", 50).null(),
            Field::boolean("hardware_flag").default(false),
            Field::boolean("books_flag").default(false),
        ],
        ModelOptions::default().db_table("resources_details"),
    ))
    .operation(Operation::remove_field("hardware", "resource"))
    .operation(Operation::alter_model_table("resources", "resources"))
    .operation(Operation::create_model(
        "Rents",
        vec![
            Field::big_auto("id"),
            Field::date("reservation_date"),
            Field::date("return_date"),
            Field::foreign_key("payment", "Payment", OnDelete::Cascade).related_name("rents"),
            Field::foreign_key("resource", "Resources", OnDelete::Cascade).related_name("rents"),
            Field::foreign_key("user", "UserRoomBooking", OnDelete::Cascade)
                .related_name("rents"),
        ],
        ModelOptions::default()
            .db_table("rents")
            .unique_together(&["resource", "payment", "user"]),
    ))
    .operation(Operation::rename_model("Resource", "Resources"))
    .operation(Operation::create_model(
        "RoomPolicy",
        vec![
            Field::auto("policy_id"),
            Field::text("policy_text"),
            Field::foreign_key("room", "Room", OnDelete::Cascade).related_name("policies"),
            Field::foreign_key("user", "UserRoomBooking", OnDelete::SetNull)
                .null()
                .related_name("policies"),
        ],
        ModelOptions::default().db_table("room_policy"),
    ))
    .operation(Operation::delete_model("Book"))
    .operation(Operation::delete_model("Hardware"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_in_order() {
        let descriptions: Vec<String> = transition()
            .operations
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            descriptions,
            vec![
                "Create model ResourcesDetails",
                "Remove field resource from hardware",
                "Rename table for resources to resources",
                "Create model Rents",
                "Rename model Resource to Resources",
                "Create model RoomPolicy",
                "Delete model Book",
                "Delete model Hardware",
            ]
        );
    }
}
