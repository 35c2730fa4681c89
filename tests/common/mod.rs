use anyhow::{Context, Result};
use chrono::NaiveDate;
use roombook_schema::adminapi;
use roombook_schema::editor::{row, MemoryDatabase, Value};
use roombook_schema::migrate::Executor;
use roombook_schema::schema::{Transition, TransitionKey};

pub fn setup_logging() -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()
        .context("Failed to setup logging utility")
}

pub fn transition(number: u32) -> Transition {
    adminapi::transitions()
        .into_iter()
        .find(|t| t.key.number() == Some(number))
        .unwrap()
}

pub fn key(number: u32) -> TransitionKey {
    transition(number).key
}

/// An executor with every transition up to and including `number` applied
pub fn executor_at(number: u32) -> Executor<MemoryDatabase> {
    let _ = setup_logging();

    let mut executor = Executor::new(adminapi::APP_LABEL, MemoryDatabase::default());
    let graph = adminapi::graph().unwrap();

    executor.migrate(&graph, Some(&key(number))).unwrap();

    executor
}

pub fn date(y: i32, m: u32, d: u32) -> Value {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().into()
}

/// Primary keys of the rows created by [`seed`]
pub struct Seeded {
    pub building: Value,
    pub room: Value,
    pub user: Value,
    pub payment: Value,
    pub resource: Value,
}

/// Fills the tables present after `0002` with one row each
pub fn seed(db: &mut MemoryDatabase) -> Seeded {
    let building = db
        .insert(
            "adminapi_building",
            row([
                ("department_name", "Computer Science".into()),
                ("no_of_floors", 4.into()),
            ]),
        )
        .unwrap();

    let room = db
        .insert(
            "adminapi_room",
            row([
                ("room_no", "A-101".into()),
                ("capacity", 120.into()),
                ("room_type", "lecture hall".into()),
                ("building_id", building.clone()),
            ]),
        )
        .unwrap();

    let user = db
        .insert(
            "adminapi_userroombooking",
            row([
                ("user_name", "alex".into()),
                ("email", "alex@example.com".into()),
                ("password", "secret".into()),
            ]),
        )
        .unwrap();

    let payment = db
        .insert(
            "adminapi_payment",
            row([
                ("amount", 25.into()),
                ("payment_date", date(2024, 12, 1)),
                ("status", "paid".into()),
            ]),
        )
        .unwrap();

    let resource = db
        .insert(
            "resources",
            row([
                ("resource_name", "Projector".into()),
                ("resource_type", "hardware".into()),
            ]),
        )
        .unwrap();

    db.insert(
        "adminapi_hardware",
        row([
            ("hardware_name", "Epson EB-X49".into()),
            ("resource_id", resource.clone()),
        ]),
    )
    .unwrap();

    db.insert(
        "adminapi_book",
        row([("title", "Dune".into()), ("isbn", "9780441013593".into())]),
    )
    .unwrap();

    Seeded {
        building,
        room,
        user,
        payment,
        resource,
    }
}
