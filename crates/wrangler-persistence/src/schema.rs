//! Esquema diesel, mantenido a mano en sincronía con `migrations/`.

diesel::table! {
    contexts (id) {
        id -> BigInt,
        code_cid -> Nullable<Text>,
        method_num -> Nullable<Integer>,
    }
}

diesel::table! {
    points (id) {
        id -> BigInt,
        event -> Nullable<Text>,
        label -> Nullable<Text>,
    }
}

diesel::table! {
    traces (trace_id) {
        trace_id -> BigInt,
        message_id -> BigInt,
        context_id -> BigInt,
        point_id -> BigInt,
        elapsed_rel_ns -> BigInt,
        elapsed_cum_ns -> BigInt,
        fuel_consumed -> Nullable<BigInt>,
        gas_consumed -> Nullable<BigInt>,
    }
}

diesel::joinable!(traces -> contexts (context_id));
diesel::joinable!(traces -> points (point_id));

diesel::allow_tables_to_appear_in_same_query!(contexts, points, traces);
