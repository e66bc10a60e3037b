//! Diesel table definitions for the measurement store.
//!
//! Tables are created and migrated outside this crate. Enumerated columns
//! (OARC ratings, DNS consistency, blocking verdicts) are stored as their
//! lowercase or upper-case wire labels in `VARCHAR` columns.

diesel::table! {
    /// Autonomous Systems and their registered organisation.
    asns (id) {
        /// AS number.
        id -> Int8,
        asn_organization -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Announced network blocks; many blocks per AS.
    asn_networks (id) {
        id -> Int4,
        asn -> Int8,
        network -> Cidr,
    }
}

diesel::table! {
    /// Vendor records keyed by MAC prefix and mask.
    macs_manuf (mac, mask) {
        mac -> Macaddr,
        mask -> Int4,
        manuf -> Nullable<Varchar>,
        comment -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// One row per top-level submission.
    tests (id) {
        id -> Int4,
        public_ip -> Inet,
        /// Assigned by the engine when the session is recorded.
        timestamp -> Timestamptz,
        asn_id -> Nullable<Int8>,
        device_android -> Nullable<Varchar>,
        mac -> Nullable<Macaddr>,
        mask -> Nullable<Int4>,
        place -> Nullable<Varchar>,
        username -> Nullable<Varchar>,
    }
}

diesel::table! {
    protocol_tests (id) {
        id -> Int4,
        test_id -> Int4,
        protocol_name -> Varchar,
        key_management -> Nullable<Varchar>,
        cipher -> Nullable<Varchar>,
    }
}

diesel::table! {
    devices_tests (id) {
        id -> Int4,
        test_id -> Int4,
        mac -> Macaddr,
        mask -> Int4,
        router -> Bool,
        private_ip -> Inet,
    }
}

diesel::table! {
    dns_tests (id) {
        id -> Int4,
        test_id -> Int4,
        dns1_android -> Nullable<Inet>,
        dns2_android -> Nullable<Inet>,
        ns_akamai -> Nullable<Inet>,
        ecs_akamai -> Nullable<Inet>,
        ip_akamai -> Nullable<Inet>,
        do_flag -> Nullable<Bool>,
        ad_flag -> Nullable<Bool>,
        rrsig -> Nullable<Bool>,
        resolver_ip_oarc -> Nullable<Inet>,
        rating_source_port -> Nullable<Varchar>,
        rating_transaction_id -> Nullable<Varchar>,
        std_source_port -> Nullable<Int8>,
        std_transaction_id -> Nullable<Int8>,
        bits_of_entropy_source_port -> Nullable<Float8>,
        bits_of_entropy_transaction_id -> Nullable<Float8>,
    }
}

diesel::table! {
    ndt_tests_ooni (id) {
        id -> Int4,
        test_id -> Int4,
        report_id -> Varchar,
        avg_rtt -> Nullable<Float8>,
        download -> Float8,
        mss -> Nullable<Int4>,
        max_rtt -> Nullable<Float8>,
        min_rtt -> Nullable<Float8>,
        ping -> Nullable<Float8>,
        retransmit_rate -> Nullable<Float8>,
        upload -> Float8,
    }
}

diesel::table! {
    web_tests_ooni (id) {
        id -> Int4,
        test_id -> Int4,
        report_id -> Varchar,
        url -> Varchar,
        resolver_asn -> Varchar,
        resolver_ip -> Inet,
        resolver_network_name -> Varchar,
        client_resolver -> Inet,
        dns_experiment_failure -> Nullable<Varchar>,
        control_failure -> Nullable<Varchar>,
        http_experiment_failure -> Nullable<Varchar>,
        dns_consistency -> Nullable<Varchar>,
        body_length_match -> Nullable<Bool>,
        headers_match -> Nullable<Bool>,
        status_code_match -> Nullable<Bool>,
        title_match -> Nullable<Bool>,
        accessible -> Nullable<Bool>,
        blocking -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// TCP-connect attempts owned by a web test.
    tcp_connect_web_tests_ooni (id) {
        id -> Int4,
        test_id -> Int4,
        ip -> Nullable<Inet>,
        port -> Nullable<Int4>,
        status_blocked -> Nullable<Bool>,
        status_failure_string -> Nullable<Varchar>,
        status_success -> Bool,
    }
}

diesel::joinable!(asn_networks -> asns (asn));
diesel::joinable!(tests -> asns (asn_id));
diesel::joinable!(protocol_tests -> tests (test_id));
diesel::joinable!(devices_tests -> tests (test_id));
diesel::joinable!(dns_tests -> tests (test_id));
diesel::joinable!(ndt_tests_ooni -> tests (test_id));
diesel::joinable!(web_tests_ooni -> tests (test_id));
diesel::joinable!(tcp_connect_web_tests_ooni -> web_tests_ooni (test_id));

diesel::allow_tables_to_appear_in_same_query!(
    asns,
    asn_networks,
    macs_manuf,
    tests,
    protocol_tests,
    devices_tests,
    dns_tests,
    ndt_tests_ooni,
    web_tests_ooni,
    tcp_connect_web_tests_ooni,
);
