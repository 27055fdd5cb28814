diesel::table! {
    clinics (id) {
        id -> Uuid,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        full_name -> Text,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customers (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        full_name -> Text,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        address -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    animals (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        customer_id -> Nullable<Uuid>,
        name -> Text,
        ear_tag_number -> Nullable<Text>,
        species -> Text,
        breed -> Nullable<Text>,
        gender -> Nullable<Text>,
        dob -> Nullable<Date>,
        status -> Text,
        location -> Nullable<Text>,
        microchip_id -> Nullable<Text>,
        current_weight -> Nullable<Numeric>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    health_records (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        animal_id -> Uuid,
        event_type -> Text,
        event_date -> Date,
        diagnosis -> Nullable<Text>,
        treatment -> Nullable<Text>,
        vaccine_name -> Nullable<Text>,
        batch_no -> Nullable<Text>,
        dose -> Nullable<Text>,
        insemination_type -> Nullable<Text>,
        next_check_date -> Nullable<Date>,
        administered_by -> Nullable<Uuid>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        customer_id -> Uuid,
        animal_id -> Nullable<Uuid>,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        appointment_type -> Text,
        address -> Nullable<Text>,
        status -> Text,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    transactions (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        customer_id -> Nullable<Uuid>,
        amount -> Numeric,
        transaction_type -> Text,
        category -> Nullable<Text>,
        description -> Nullable<Text>,
        transaction_date -> Date,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        customer_id -> Nullable<Uuid>,
        amount -> Numeric,
        payment_method -> Text,
        payment_date -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    product_categories (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        category_id -> Nullable<Uuid>,
        name -> Text,
        quantity -> Int4,
        critical_stock_limit -> Int4,
        track_stock -> Bool,
        price -> Numeric,
        tax_rate -> Numeric,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reminders (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        animal_id -> Uuid,
        due_date -> Date,
        message -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    audit_logs (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        user_id -> Nullable<Uuid>,
        action -> Text,
        target_table -> Text,
        target_id -> Uuid,
        details -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ai_chat_sessions (id) {
        id -> Uuid,
        clinic_id -> Uuid,
        animal_id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ai_chat_messages (id) {
        id -> Uuid,
        session_id -> Uuid,
        role -> Text,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> clinics (clinic_id));
diesel::joinable!(customers -> clinics (clinic_id));
diesel::joinable!(animals -> customers (customer_id));
diesel::joinable!(health_records -> animals (animal_id));
diesel::joinable!(appointments -> customers (customer_id));
diesel::joinable!(appointments -> animals (animal_id));
diesel::joinable!(transactions -> customers (customer_id));
diesel::joinable!(payments -> customers (customer_id));
diesel::joinable!(products -> product_categories (category_id));
diesel::joinable!(reminders -> animals (animal_id));
diesel::joinable!(ai_chat_messages -> ai_chat_sessions (session_id));

diesel::allow_tables_to_appear_in_same_query!(
    clinics,
    profiles,
    customers,
    animals,
    health_records,
    appointments,
    transactions,
    payments,
    product_categories,
    products,
    reminders,
    audit_logs,
    ai_chat_sessions,
    ai_chat_messages,
);
