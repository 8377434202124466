fn main() {
    println!("cargo:rerun-if-env-changed=SENSORNODE_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=SENSORNODE_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=SENSORNODE_BROKER_URL");
    println!("cargo:rerun-if-env-changed=SENSORNODE_CONFIG_JSON");

    // Only flash builds need the ESP-IDF environment exported.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
