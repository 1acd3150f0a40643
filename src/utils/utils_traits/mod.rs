use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::utils::utils_errors::UrdfSceneError;

pub trait ToAndFromRonString: Serialize + DeserializeOwned {
    fn to_ron_string(&self) -> Result<String, UrdfSceneError> {
        ron::to_string(self).map_err(|e| UrdfSceneError::new_generic_error_str(&format!("Could not serialize to ron: {}", e), file!(), line!()))
    }
    fn load_from_ron_string(ron_string: &str) -> Result<Self, UrdfSceneError> where Self: Sized {
        let load: Result<Self, _> = ron::from_str(ron_string);
        return match load {
            Ok(load) => { Ok(load) }
            Err(e) => { Err(UrdfSceneError::new_generic_error_str(&format!("Could not load ron string {:?} into correct type ({}).", ron_string, e), file!(), line!())) }
        }
    }
}
impl <T> ToAndFromRonString for T where T: Serialize + DeserializeOwned {  }

pub trait ToAndFromJsonString: Serialize + DeserializeOwned {
    fn to_json_string(&self) -> Result<String, UrdfSceneError> {
        serde_json::to_string(self).map_err(|e| UrdfSceneError::new_generic_error_str(&format!("Could not serialize to json: {}", e), file!(), line!()))
    }
    fn load_from_json_string(json_str: &str) -> Result<Self, UrdfSceneError> where Self: Sized {
        let load: Result<Self, _> = serde_json::from_str(json_str);
        return match load {
            Ok(load) => { Ok(load) }
            Err(e) => { Err(UrdfSceneError::new_generic_error_str(&format!("Could not load json string {:?} into correct type ({}).", json_str, e), file!(), line!())) }
        }
    }
}
impl <T> ToAndFromJsonString for T where T: Serialize + DeserializeOwned {  }
