fn main() {
    pinpath_lib::run();
}
