fn main() {
    // ESP-IDF link arguments are only needed for flash builds; host builds
    // (tests, fuzzing) have nothing to emit.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
