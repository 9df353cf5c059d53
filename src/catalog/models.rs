//! Register maps of supported Bluetti models.

use crate::catalog::field::{EnumVariants, Field};

/// Static description of one device family.
#[derive(Debug)]
pub struct ModelDefinition {
    /// Model name as advertised over BLE (name prefix).
    pub type_name: &'static str,
    /// All known fields.
    pub fields: &'static [Field],
    /// Register blocks read on every poll, as `(address, quantity)`.
    pub polling: &'static [(u16, u16)],
}

const OUTPUT_MODE: EnumVariants = &[
    (0, "STOP"),
    (1, "INVERTER_OUTPUT"),
    (2, "BYPASS_OUTPUT_C"),
    (3, "BYPASS_OUTPUT_D"),
    (4, "LOAD_MATCHING"),
];

const UPS_MODE: EnumVariants = &[
    (1, "CUSTOMIZED"),
    (2, "PV_PRIORITY"),
    (3, "STANDARD"),
    (4, "TIME_CONTROL"),
];

const MACHINE_ADDRESS: EnumVariants = &[(0, "SLAVE"), (1, "MASTER")];

const AUTO_SLEEP_MODE: EnumVariants = &[
    (2, "THIRTY_SECONDS"),
    (3, "ONE_MINUTE"),
    (4, "FIVE_MINUTES"),
    (5, "NEVER"),
];

const LED_MODE: EnumVariants = &[(1, "LED_LOW"), (2, "LED_HIGH"), (3, "LED_SOS"), (4, "LED_OFF")];

const ECO_SHUTDOWN: EnumVariants = &[
    (1, "ONE_HOUR"),
    (2, "TWO_HOURS"),
    (3, "THREE_HOURS"),
    (4, "FOUR_HOURS"),
];

const CHARGING_MODE: EnumVariants = &[(0, "STANDARD"), (1, "SILENT"), (2, "TURBO")];

pub static AC300: ModelDefinition = ModelDefinition {
    type_name: "AC300",
    fields: &[
        // Core
        Field::text("device_type", 10, 6),
        Field::serial_number("serial_number", 17),
        Field::version("arm_version", 23),
        Field::version("dsp_version", 25),
        Field::uint("dc_input_power", 36),
        Field::uint("ac_input_power", 37),
        Field::uint("ac_output_power", 38),
        Field::uint("dc_output_power", 39),
        Field::decimal("power_generation", 41, 1),
        Field::uint("total_battery_percent", 43),
        Field::bool("ac_output_on", 48),
        Field::bool("dc_output_on", 49),
        // Details
        Field::enumeration("ac_output_mode", 70, OUTPUT_MODE),
        Field::decimal("internal_ac_voltage", 71, 1),
        Field::decimal("internal_current_one", 72, 1),
        Field::uint("internal_power_one", 73),
        Field::decimal("internal_ac_frequency", 74, 2),
        Field::decimal("internal_current_two", 75, 1),
        Field::uint("internal_power_two", 76),
        Field::decimal("ac_input_voltage", 77, 1),
        Field::decimal("internal_current_three", 78, 1),
        Field::uint("internal_power_three", 79),
        Field::decimal("ac_input_frequency", 80, 2),
        Field::decimal("internal_dc_input_voltage", 86, 1),
        Field::uint("internal_dc_input_power", 87),
        Field::decimal("internal_dc_input_current", 88, 1),
        // Controls
        Field::enumeration("ups_mode", 3001, UPS_MODE).writable(),
        Field::bool("split_phase_on", 3004),
        Field::enumeration("split_phase_machine_mode", 3005, MACHINE_ADDRESS),
        Field::uint("pack_num", 3006).writable(),
        Field::bool("ac_output_on", 3007).writable(),
        Field::bool("dc_output_on", 3008).writable(),
        Field::bool("grid_charge_on", 3011).writable(),
        Field::bool("time_control_on", 3013).writable(),
        Field::uint("battery_range_start", 3015).writable(),
        Field::uint("battery_range_end", 3016).writable(),
        Field::bool("bluetooth_connected", 3036),
        Field::enumeration("auto_sleep_mode", 3061, AUTO_SLEEP_MODE).writable(),
    ],
    polling: &[(10, 40), (70, 21), (3000, 62)],
};

pub static AC200M: ModelDefinition = ModelDefinition {
    type_name: "AC200M",
    fields: &[
        // Core
        Field::text("device_type", 10, 6),
        Field::serial_number("serial_number", 17),
        Field::version("arm_version", 23),
        Field::version("dsp_version", 25),
        Field::uint("dc_input_power", 36),
        Field::uint("ac_input_power", 37),
        Field::uint("ac_output_power", 38),
        Field::uint("dc_output_power", 39),
        Field::decimal("power_generation", 41, 1),
        Field::uint("total_battery_percent", 43),
        Field::bool("ac_output_on", 48),
        Field::bool("dc_output_on", 49),
        // Battery packs
        Field::uint("pack_num_max", 91),
        Field::decimal("total_battery_voltage", 92, 1),
        Field::uint("pack_num", 96),
        Field::decimal("pack_voltage", 98, 2),
        Field::uint("pack_battery_percent", 99),
        // Controls
        Field::bool("ac_output_on", 3007).writable(),
        Field::bool("dc_output_on", 3008).writable(),
        Field::bool("power_off", 3060).writable(),
        Field::enumeration("auto_sleep_mode", 3061, AUTO_SLEEP_MODE).writable(),
    ],
    polling: &[(10, 40), (91, 9), (3000, 62)],
};

pub static EB3A: ModelDefinition = ModelDefinition {
    type_name: "EB3A",
    fields: &[
        // Core
        Field::text("device_type", 10, 6),
        Field::serial_number("serial_number", 17),
        Field::version("arm_version", 23),
        Field::version("dsp_version", 25),
        Field::uint("dc_input_power", 36),
        Field::uint("ac_input_power", 37),
        Field::uint("ac_output_power", 38),
        Field::uint("dc_output_power", 39),
        Field::decimal("power_generation", 41, 1),
        Field::uint("total_battery_percent", 43),
        Field::bool("ac_output_on", 48),
        Field::bool("dc_output_on", 49),
        // Details
        Field::decimal("internal_dc_input_voltage", 86, 1),
        Field::uint("internal_dc_input_power", 87),
        Field::decimal("internal_dc_input_current", 88, 1),
        // Controls
        Field::bool("ac_output_on", 3007).writable(),
        Field::bool("dc_output_on", 3008).writable(),
        Field::enumeration("led_mode", 3034, LED_MODE).writable(),
        Field::bool("power_off", 3060).writable(),
        Field::bool("eco_on", 3061).writable(),
        Field::enumeration("eco_shutdown", 3062, ECO_SHUTDOWN).writable(),
        Field::enumeration("charging_mode", 3065, CHARGING_MODE).writable(),
        Field::bool("power_lifting_on", 3066).writable(),
    ],
    polling: &[(10, 40), (70, 21), (3000, 67)],
};

/// All supported models, longest type name first so prefixes match greedily.
pub static MODELS: &[&ModelDefinition] = &[&AC200M, &AC300, &EB3A];
